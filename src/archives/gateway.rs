use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::clock::parse_utc_timestamp;
use super::codec::{decode_blocking, DecodedArchive};
use super::display::DailyMatchRecord;
use super::entitlement::{unlock_at, CallerIdentity, EntitlementEvaluator};
use super::error::{ArchiveError, ArchiveResult};
use super::keys::{
    date_from_key, index_version, strip_archive_suffix, yyyymmdd_to_iso, ArchiveKind, ArchiveObjectRef,
    IndexEntity, PhotoGender, ARCHIVE_SUFFIX,
};
use super::lock::{iso, LockedDetails};
use super::storage::ArchiveStorage;

/// Scheduled start, zone-less values are UTC
pub const START_FIELD: &str = "m003";
/// Finished flag, JSON truthiness
pub const FINISHED_FIELD: &str = "m656";

pub const INDEX_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Serialize)]
pub struct DailyMatches {
    pub date: String,
    pub count: usize,
    pub matches: Vec<DailyMatchRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestDaily {
    pub date: String,
    pub iso: String,
    pub filename: String,
    pub source: &'static str,
}

/// Outcome of a detail request. `Locked` is a business result, not an error.
#[derive(Debug, Clone)]
pub enum MatchDetails {
    Visible { document: Value, text: String },
    Locked(LockedDetails),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPointer {
    pub version: String,
    pub url: String,
    pub content_type: &'static str,
}

/// Points clients at the newest name index and the covered date range
#[derive(Debug, Clone)]
pub struct Manifest {
    pub entity: IndexEntity,
    pub range: DateRange,
    pub generated_at_utc: DateTime<Utc>,
    pub index: IndexPointer,
}

impl Serialize for Manifest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut body = Map::new();
        body.insert("minDate".into(), json!(self.range.min_date));
        body.insert("maxDate".into(), json!(self.range.max_date));
        body.insert("generatedAtUtc".into(), json!(iso(self.generated_at_utc)));
        body.insert(self.entity.as_str().into(), json!(self.index));
        if self.entity == IndexEntity::Tournaments {
            body.insert("tournamentStrength".into(), Value::Null);
        }
        body.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStatus {
    pub ok: bool,
    pub source: &'static str,
    pub storage: Value,
    pub daily: Value,
    pub indexes: Value,
    pub now_utc: String,
}

/// Rating history of one player, decoded
#[derive(Debug, Clone, Serialize)]
pub struct PlayerTimeSeries {
    pub ok: bool,
    #[serde(rename = "playerTPId")]
    pub player_tp_id: u64,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerPhoto {
    Found(Vec<u8>),
    /// No photo for this player, the caller should redirect to the default
    Fallback(PhotoGender),
}

/// Debug view of the lock math for one match, evaluated as an anonymous caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockProbe {
    pub ok: bool,
    pub id: String,
    pub forced_now_iso: Option<String>,
    pub now_iso: String,
    pub expected_start_utc: Value,
    pub start_iso: Option<String>,
    pub unlock_at_iso: Option<String>,
    pub lock_hours: u32,
    pub is_finished: bool,
    pub allowed_as_guest: bool,
    pub locked_response_example: LockedDetails,
}

/// Read side of the archives: storage, decoding, formatting and the details gate
pub struct ArchiveGateway {
    storage: Arc<dyn ArchiveStorage>,
    evaluator: EntitlementEvaluator,
    lock_hours: u32,
}

impl ArchiveGateway {
    pub fn new(storage: Arc<dyn ArchiveStorage>, evaluator: EntitlementEvaluator, lock_hours: u32) -> Self {
        Self {
            storage,
            evaluator,
            lock_hours,
        }
    }

    pub fn evaluator(&self) -> &EntitlementEvaluator {
        &self.evaluator
    }

    pub fn lock_hours(&self) -> u32 {
        self.lock_hours
    }

    pub fn source(&self) -> &'static str {
        self.storage.source()
    }

    /// Daily keys that name a real calendar date, ascending
    async fn daily_keys(&self) -> ArchiveResult<Vec<(String, NaiveDate)>> {
        let names = self.storage.list(ArchiveKind::Daily).await?;
        Ok(names
            .iter()
            .filter_map(|name| strip_archive_suffix(name))
            .filter_map(|key| match date_from_key(key) {
                Some(date) => Some((key.to_string(), date)),
                None => {
                    debug!("Skipping daily archive with impossible date {}", key);
                    None
                }
            })
            .collect())
    }

    pub async fn list_available_dates(&self) -> ArchiveResult<Vec<NaiveDate>> {
        let keys = self.daily_keys().await?;
        Ok(keys.into_iter().map(|(_, date)| date).collect())
    }

    pub async fn date_range(&self) -> ArchiveResult<Option<DateRange>> {
        let dates = self.list_available_dates().await?;
        Ok(match (dates.first(), dates.last()) {
            (Some(min), Some(max)) => Some(DateRange {
                min_date: *min,
                max_date: *max,
            }),
            _ => None,
        })
    }

    pub async fn latest_daily(&self) -> ArchiveResult<Option<LatestDaily>> {
        let mut keys = self.daily_keys().await?;
        Ok(keys.pop().map(|(key, _)| LatestDaily {
            iso: yyyymmdd_to_iso(&key),
            filename: format!("{}{}", key, ARCHIVE_SUFFIX),
            date: key,
            source: self.storage.source(),
        }))
    }

    async fn fetch(&self, object: &ArchiveObjectRef) -> ArchiveResult<DecodedArchive> {
        let bytes = self.storage.read(object).await?;
        decode_blocking(object.to_string(), bytes).await
    }

    /// Day's matches with display fields; never gated
    pub async fn get_daily_matches(&self, date: &str) -> ArchiveResult<DailyMatches> {
        let object = ArchiveObjectRef::daily(date)?;
        let decoded = self.fetch(&object).await?;

        let Value::Array(rows) = decoded.value else {
            return Err(ArchiveError::corrupt(object.to_string(), "Archive content is not an array."));
        };

        let matches: Vec<DailyMatchRecord> = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(raw) => DailyMatchRecord::from_raw(raw),
                _ => DailyMatchRecord::from_raw(Map::new()),
            })
            .collect();

        Ok(DailyMatches {
            date: object.key().to_string(),
            count: matches.len(),
            matches,
        })
    }

    pub async fn get_match_details(&self, id: &str, caller: &CallerIdentity) -> ArchiveResult<MatchDetails> {
        let object = ArchiveObjectRef::match_detail(id)?;
        let decoded = self.fetch(&object).await?;

        if is_finished(&decoded.value) {
            return Ok(MatchDetails::Visible {
                document: decoded.value,
                text: decoded.text,
            });
        }

        let scheduled = scheduled_start(&decoded.value);
        if self.evaluator.can_view_details(caller, scheduled, self.lock_hours) {
            return Ok(MatchDetails::Visible {
                document: decoded.value,
                text: decoded.text,
            });
        }

        debug!("Match {} locked for {:?} caller", id, caller.tier(self.evaluator.now()));
        Ok(MatchDetails::Locked(LockedDetails::new(scheduled, self.lock_hours)))
    }

    pub async fn latest_index(&self, entity: IndexEntity) -> ArchiveResult<Option<String>> {
        let mut files = self.storage.list(ArchiveKind::NameIndex(entity)).await?;
        Ok(files.pop())
    }

    pub async fn get_manifest(&self, entity: IndexEntity) -> ArchiveResult<Manifest> {
        let (range, latest) = futures::try_join!(self.date_range(), self.latest_index(entity))?;

        let range = range.ok_or_else(|| ArchiveError::not_found("No daily archives found."))?;
        let latest = latest.ok_or_else(|| ArchiveError::not_found(format!("No {} index files found.", entity)))?;

        let version = index_version(&latest).unwrap_or_else(|| {
            warn!("Index file {} carries no version token, using the file name", latest);
            latest.clone()
        });

        Ok(Manifest {
            entity,
            range,
            generated_at_utc: self.evaluator.now(),
            index: IndexPointer {
                version,
                url: latest,
                content_type: INDEX_CONTENT_TYPE,
            },
        })
    }

    /// Raw compressed index bytes, served as-is to clients that decode locally
    pub async fn read_index(&self, entity: IndexEntity, file: &str) -> ArchiveResult<Vec<u8>> {
        let object = ArchiveObjectRef::name_index(entity, file)?;
        self.storage.read(&object).await
    }

    pub async fn get_player_time_series(&self, id: &str) -> ArchiveResult<PlayerTimeSeries> {
        let object = ArchiveObjectRef::player_time_series(id)?;
        let player_tp_id = object
            .key()
            .parse()
            .map_err(|_| ArchiveError::invalid_key("Invalid player id."))?;
        let decoded = self.fetch(&object).await?;

        Ok(PlayerTimeSeries {
            ok: true,
            player_tp_id,
            data: decoded.value,
        })
    }

    /// Raw JPEG bytes. A missing player photo falls back to a default, a
    /// missing default is `NotFound`.
    pub async fn get_player_photo(&self, id: &str, gender: PhotoGender) -> ArchiveResult<PlayerPhoto> {
        let object = ArchiveObjectRef::player_photo(id)?;
        match self.storage.read(&object).await {
            Ok(bytes) => Ok(PlayerPhoto::Found(bytes)),
            Err(ArchiveError::NotFound(_)) if !object.is_default_photo() => {
                debug!("No photo for player {}, falling back to {}", id, gender.default_photo());
                Ok(PlayerPhoto::Fallback(gender))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn status(&self) -> ArchiveResult<ArchiveStatus> {
        let (range, latest_daily, players, tournaments) = futures::try_join!(
            self.date_range(),
            self.latest_daily(),
            self.latest_index(IndexEntity::Players),
            self.latest_index(IndexEntity::Tournaments),
        )?;

        Ok(ArchiveStatus {
            ok: true,
            source: self.storage.source(),
            storage: self.storage.describe(),
            daily: json!({
                "range": range,
                "latest": latest_daily.map(|l| json!({ "yyyymmdd": l.date, "iso": l.iso })),
            }),
            indexes: json!({
                "players": players.map(|latest| json!({ "latest": latest })),
                "tournaments": tournaments.map(|latest| json!({ "latest": latest })),
            }),
            now_utc: iso(self.evaluator.now()),
        })
    }

    pub async fn lock_probe(&self, id: &str) -> ArchiveResult<LockProbe> {
        let object = ArchiveObjectRef::match_detail(id)?;
        let decoded = self.fetch(&object).await?;

        let finished = is_finished(&decoded.value);
        let scheduled = scheduled_start(&decoded.value);
        let clock = self.evaluator.clock();
        let allowed_as_guest =
            finished || self.evaluator.can_view_details(&CallerIdentity::Anonymous, scheduled, self.lock_hours);

        Ok(LockProbe {
            ok: true,
            id: object.key().to_string(),
            forced_now_iso: clock.forced().map(iso),
            now_iso: iso(clock.now()),
            expected_start_utc: decoded.value.get(START_FIELD).cloned().unwrap_or(Value::Null),
            start_iso: scheduled.map(iso),
            unlock_at_iso: scheduled.map(|s| iso(unlock_at(s, self.lock_hours))),
            lock_hours: self.lock_hours,
            is_finished: finished,
            allowed_as_guest,
            locked_response_example: LockedDetails::new(scheduled, self.lock_hours),
        })
    }
}

fn is_finished(document: &Value) -> bool {
    match document.get(FINISHED_FIELD) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn scheduled_start(document: &Value) -> Option<DateTime<Utc>> {
    document
        .get(START_FIELD)
        .and_then(Value::as_str)
        .and_then(parse_utc_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archives::clock::FixedClock;
    use crate::archives::codec::{encode, encode_bytes};
    use crate::archives::entitlement::Account;
    use crate::archives::storage::remote::tests::PagedBucket;
    use crate::archives::storage::RemoteStorage;
    use chrono::TimeZone;
    use std::sync::atomic::Ordering;
    use uuid::Uuid;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, s).unwrap()
    }

    fn gateway(bucket: PagedBucket, now: DateTime<Utc>, force_lock: bool) -> ArchiveGateway {
        let storage = Arc::new(RemoteStorage::new(Arc::new(bucket)));
        let evaluator = EntitlementEvaluator::new(Arc::new(FixedClock(now)), force_lock);
        ArchiveGateway::new(storage, evaluator, 2)
    }

    fn bucket_with(objects: Vec<(&str, Vec<u8>)>) -> PagedBucket {
        let mut bucket = PagedBucket::new(2);
        for (key, bytes) in objects {
            bucket.objects.insert(key.to_string(), bytes);
        }
        bucket
    }

    fn upcoming() -> Vec<u8> {
        encode(&json!({"m003": "2025-06-01T10:00:00", "m656": false, "odds": 1.9})).unwrap()
    }

    #[tokio::test]
    async fn upcoming_match_locks_until_window_opens() {
        let anon = CallerIdentity::Anonymous;

        let early = gateway(bucket_with(vec![("matches/123456.br", upcoming())]), at(7, 59, 59), false);
        match early.get_match_details("123456", &anon).await.unwrap() {
            MatchDetails::Locked(locked) => {
                assert_eq!(locked.unlocks_at.as_deref(), Some("2025-06-01T08:00:00.000Z"));
            }
            other => panic!("expected lock, got {other:?}"),
        }

        let open = gateway(bucket_with(vec![("matches/123456.br", upcoming())]), at(8, 0, 0), false);
        match open.get_match_details("123456", &anon).await.unwrap() {
            MatchDetails::Visible { document, .. } => assert_eq!(document["odds"], 1.9),
            other => panic!("expected visible, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn finished_match_is_never_locked() {
        let finished = encode(&json!({"m003": "2025-06-01T10:00:00Z", "m656": 1})).unwrap();
        let gw = gateway(bucket_with(vec![("matches/123456.br", finished)]), at(0, 0, 0), true);
        let result = gw.get_match_details("123456", &CallerIdentity::Anonymous).await.unwrap();
        assert!(matches!(result, MatchDetails::Visible { .. }));
    }

    #[tokio::test]
    async fn trialing_member_sees_upcoming_match() {
        let mut account = Account::free(Uuid::new_v4(), "trial");
        account.trial_ends_at = Some(at(23, 0, 0));
        let gw = gateway(bucket_with(vec![("matches/123456.br", upcoming())]), at(1, 0, 0), false);
        let result = gw
            .get_match_details("123456", &CallerIdentity::Member(account))
            .await
            .unwrap();
        assert!(matches!(result, MatchDetails::Visible { .. }));
    }

    #[tokio::test]
    async fn error_taxonomy() {
        let gw = gateway(
            bucket_with(vec![
                ("matches/111111.br", b"garbage".to_vec()),
                ("daily/20250601.br", encode(&json!({"not": "an array"})).unwrap()),
            ]),
            at(0, 0, 0),
            false,
        );
        let anon = CallerIdentity::Anonymous;

        assert!(matches!(
            gw.get_match_details("../etc", &anon).await,
            Err(ArchiveError::InvalidKey(_))
        ));
        assert!(matches!(
            gw.get_match_details("222222", &anon).await,
            Err(ArchiveError::NotFound(_))
        ));
        assert!(matches!(
            gw.get_match_details("111111", &anon).await,
            Err(ArchiveError::CorruptArchive { .. })
        ));
        assert!(matches!(
            gw.get_daily_matches("20250601").await,
            Err(ArchiveError::CorruptArchive { .. })
        ));
    }

    #[tokio::test]
    async fn daily_rows_get_display_fields() {
        let rows = json!([
            {"tournamentEventName": "Halle", "player1Name": "A", "player2Name": "B", "result": "20"},
            {"tournamentEventName": "Queens", "player1Name": "C", "player2Name": "D"}
        ]);
        let gw = gateway(
            bucket_with(vec![("daily/20250601.br", encode(&rows).unwrap())]),
            at(0, 0, 0),
            false,
        );

        let daily = gw.get_daily_matches("20250601").await.unwrap();
        assert_eq!(daily.date, "20250601");
        assert_eq!(daily.count, 2);
        let out = serde_json::to_value(&daily).unwrap();
        assert_eq!(out["matches"][0]["resultText"], "2:0");
        assert_eq!(out["matches"][1]["tournamentTitle"], "Queens");
    }

    #[tokio::test]
    async fn manifest_points_at_latest_index() {
        let gw = gateway(
            bucket_with(vec![
                ("daily/20240102.br", vec![]),
                ("daily/20250601.br", vec![]),
                ("daily/20240101.br", vec![]),
                ("players/indexBuild/players.index.v2026-01-20T10-00Z.br", vec![]),
                ("players/indexBuild/players.index.v2026-01-22T19-35Z.br", vec![]),
            ]),
            at(0, 0, 0),
            false,
        );

        let manifest = gw.get_manifest(IndexEntity::Players).await.unwrap();
        let out = serde_json::to_value(&manifest).unwrap();
        assert_eq!(out["minDate"], "2024-01-01");
        assert_eq!(out["maxDate"], "2025-06-01");
        assert_eq!(out["players"]["version"], "v2026-01-22T19-35Z");
        assert_eq!(out["players"]["url"], "players.index.v2026-01-22T19-35Z.br");
        assert!(out.get("tournamentStrength").is_none());

        let missing = gw.get_manifest(IndexEntity::Tournaments).await.unwrap_err();
        assert!(matches!(missing, ArchiveError::NotFound(_)));
    }

    fn gateway_over(bucket: Arc<PagedBucket>, now: DateTime<Utc>) -> ArchiveGateway {
        let evaluator = EntitlementEvaluator::new(Arc::new(FixedClock(now)), false);
        ArchiveGateway::new(Arc::new(RemoteStorage::new(bucket)), evaluator, 2)
    }

    #[tokio::test]
    async fn index_reads_are_validated_and_raw() {
        let payload = encode_bytes(b"[]").unwrap();
        let bucket = Arc::new(bucket_with(vec![("tournaments/indexBuild/t.index.br", payload.clone())]));
        let gw = gateway_over(bucket.clone(), at(0, 0, 0));

        assert!(matches!(
            gw.read_index(IndexEntity::Tournaments, "../t.index.br").await,
            Err(ArchiveError::InvalidKey(_))
        ));
        assert!(matches!(
            gw.get_match_details("12ab5", &CallerIdentity::Anonymous).await,
            Err(ArchiveError::InvalidKey(_))
        ));
        // rejected before any storage access
        assert_eq!(bucket.read_calls.load(Ordering::SeqCst), 0);

        assert_eq!(
            gw.read_index(IndexEntity::Tournaments, "t.index.br").await.unwrap(),
            payload
        );
        assert_eq!(bucket.read_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn impossible_dates_never_become_latest() {
        let gw = gateway(
            bucket_with(vec![("daily/20250601.br", vec![]), ("daily/20251399.br", vec![])]),
            at(0, 0, 0),
            false,
        );

        let range = gw.date_range().await.unwrap().unwrap();
        let latest = gw.latest_daily().await.unwrap().unwrap();
        assert_eq!(latest.date, "20250601");
        assert_eq!(latest.iso, "2025-06-01");
        assert_eq!(range.max_date.to_string(), latest.iso);

        let status = gw.status().await.unwrap();
        assert_eq!(status.daily["latest"]["yyyymmdd"], "20250601");
    }

    #[tokio::test]
    async fn generated_timestamps_follow_the_clock() {
        let pinned = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let gw = gateway(
            bucket_with(vec![
                ("daily/20240101.br", vec![]),
                ("players/indexBuild/players.index.v2026-01-22T19-35Z.br", vec![]),
            ]),
            pinned,
            false,
        );

        let manifest = gw.get_manifest(IndexEntity::Players).await.unwrap();
        assert_eq!(manifest.generated_at_utc, pinned);
        assert_eq!(gw.status().await.unwrap().now_utc, "2020-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn player_time_series_is_decoded() {
        let gw = gateway(
            bucket_with(vec![("players/ts/4321.br", encode(&json!([{"d": "2025-01-01", "r": 1500}])).unwrap())]),
            at(0, 0, 0),
            false,
        );

        let ts = gw.get_player_time_series("4321").await.unwrap();
        let out = serde_json::to_value(&ts).unwrap();
        assert_eq!(out["ok"], true);
        assert_eq!(out["playerTPId"], 4321);
        assert_eq!(out["data"][0]["r"], 1500);

        assert!(matches!(
            gw.get_player_time_series("9999").await,
            Err(ArchiveError::NotFound(_))
        ));
        assert!(matches!(
            gw.get_player_time_series("x1").await,
            Err(ArchiveError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn missing_player_photo_falls_back_to_default() {
        let gw = gateway(
            bucket_with(vec![
                ("players/photo/4321.jpg", b"jpeg".to_vec()),
                ("players/photo/photoW.jpg", b"women".to_vec()),
            ]),
            at(0, 0, 0),
            false,
        );

        assert_eq!(
            gw.get_player_photo("4321", PhotoGender::Men).await.unwrap(),
            PlayerPhoto::Found(b"jpeg".to_vec())
        );
        assert_eq!(
            gw.get_player_photo("5555", PhotoGender::Women).await.unwrap(),
            PlayerPhoto::Fallback(PhotoGender::Women)
        );
        assert_eq!(
            gw.get_player_photo("photoW.jpg", PhotoGender::Men).await.unwrap(),
            PlayerPhoto::Found(b"women".to_vec())
        );
        // a missing default is a real 404, not another redirect
        assert!(matches!(
            gw.get_player_photo("photoM.jpg", PhotoGender::Men).await,
            Err(ArchiveError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn lock_probe_reports_window() {
        let gw = gateway(bucket_with(vec![("matches/123456.br", upcoming())]), at(7, 0, 0), false);
        let probe = gw.lock_probe("123456").await.unwrap();
        assert!(!probe.allowed_as_guest);
        assert_eq!(probe.unlock_at_iso.as_deref(), Some("2025-06-01T08:00:00.000Z"));
        assert_eq!(probe.forced_now_iso.as_deref(), Some("2025-06-01T07:00:00.000Z"));
    }

    #[test]
    fn finished_flag_truthiness() {
        assert!(!is_finished(&json!({})));
        assert!(!is_finished(&json!({"m656": 0})));
        assert!(!is_finished(&json!({"m656": ""})));
        assert!(is_finished(&json!({"m656": "1"})));
        assert!(is_finished(&json!({"m656": true})));
    }
}
