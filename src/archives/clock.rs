use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;

/// Single source of "now" for the lock-window math
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;

    /// The pinned instant, if this clock ignores wall time
    fn forced(&self) -> Option<DateTime<Utc>> {
        None
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }

    fn forced(&self) -> Option<DateTime<Utc>> {
        Some(self.0)
    }
}

/// Builds the clock for `ARCHIVES_NOW_ISO`. Malformed overrides fall back to wall time.
pub fn clock_from_override(raw: Option<&str>) -> Arc<dyn Clock> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Arc::new(SystemClock);
    };

    match parse_utc_timestamp(raw) {
        Some(instant) => {
            tracing::info!("Clock pinned to {}", instant.to_rfc3339());
            Arc::new(FixedClock(instant))
        }
        None => {
            tracing::warn!("Ignoring malformed clock override '{}', using system time", raw);
            Arc::new(SystemClock)
        }
    }
}

/// Parses RFC 3339, falling back to zone-less ISO forms read as UTC.
/// Archive timestamps such as `2016-01-04T10:30:00` carry no offset, and a
/// bare `2025-06-01` is midnight UTC.
pub fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Real vs. effective time, for the debug endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshot {
    pub real_now_iso: String,
    pub forced_now_iso: Option<String>,
    pub used_now_iso: String,
    pub is_forced: bool,
}

impl ClockSnapshot {
    pub fn capture(clock: &dyn Clock) -> Self {
        let forced = clock.forced();
        Self {
            real_now_iso: Utc::now().to_rfc3339(),
            forced_now_iso: forced.map(|f| f.to_rfc3339()),
            used_now_iso: clock.now().to_rfc3339(),
            is_forced: forced.is_some(),
        }
    }
}
