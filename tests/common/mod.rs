#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use bonzobyte_api::archives::clock::parse_utc_timestamp;
use bonzobyte_api::archives::codec::encode;
use bonzobyte_api::archives::storage::{LocalDirs, LocalStorage};
use bonzobyte_api::archives::{Account, ArchiveGateway, EntitlementEvaluator, FixedClock};
use bonzobyte_api::auth::{generate_jwt, Claims};
use bonzobyte_api::config::AppConfig;
use bonzobyte_api::database::{MemoryUserStore, UserStore};
use bonzobyte_api::{app, AppState};

pub const JWT_SECRET: &str = "integration-test-secret";

/// Unfinished, zone-less start 2025-06-01T10:00 (UTC)
pub const UPCOMING_MATCH: &str = "123456";
/// Finished, same start
pub const FINISHED_MATCH: &str = "654321";
/// Unfinished, no start field
pub const UNSCHEDULED_MATCH: &str = "777777";
/// Bytes that are not brotli
pub const CORRUPT_DAY: &str = "20250531";
/// Has a rating history and a photo
pub const PLAYER_WITH_PHOTO: &str = "4321";

pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUserStore>,
    dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Default)]
pub struct AppOptions {
    pub force_lock: bool,
    pub debug_routes: bool,
    pub empty: bool,
}

pub fn spawn_app(now: &str) -> Result<TestApp> {
    spawn_app_with(
        now,
        AppOptions {
            debug_routes: true,
            ..AppOptions::default()
        },
    )
}

pub fn spawn_app_with(now: &str, options: AppOptions) -> Result<TestApp> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let dirs = LocalDirs::under(dir.path());
    if !options.empty {
        write_fixtures(&dirs)?;
    }

    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("ARCHIVES_SOURCE", "local".to_string());
    vars.insert("DATABASE_URL", "postgres://localhost/bonzobyte_test".to_string());
    vars.insert("JWT_SECRET", JWT_SECRET.to_string());
    vars.insert("ARCHIVES_DEBUG_ROUTES", options.debug_routes.to_string());
    let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).context("config")?;

    let now: DateTime<Utc> = parse_utc_timestamp(now).context("fixed clock instant")?;
    let evaluator = EntitlementEvaluator::new(Arc::new(FixedClock(now)), options.force_lock);
    let gateway = ArchiveGateway::new(Arc::new(LocalStorage::new(dirs)), evaluator, 2);

    let users = Arc::new(MemoryUserStore::new());
    let store: Arc<dyn UserStore> = users.clone();
    let state = AppState::new(config, gateway, Some(store));

    Ok(TestApp {
        router: app(state),
        users,
        dir,
    })
}

impl TestApp {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        self.get_with_token(path, None).await
    }

    pub async fn get_with_token(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        let mut request = Request::builder().uri(path);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {}", token));
        }
        let request = request.body(Body::empty())?;

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?;

        Ok(TestResponse { status, headers, body })
    }

    /// Registers the account and returns a valid bearer token for it
    pub fn login(&self, account: Account) -> Result<String> {
        let claims = Claims::new(account.id, Utc::now(), 1);
        self.users.insert(account);
        Ok(generate_jwt(JWT_SECRET, &claims)?)
    }
}

pub fn free_account() -> Account {
    Account::free(Uuid::new_v4(), "Free Tester")
}

fn write_fixtures(dirs: &LocalDirs) -> Result<()> {
    for dir in [
        &dirs.daily,
        &dirs.match_details,
        &dirs.players_index,
        &dirs.tournaments_index,
        &dirs.players_ts,
        &dirs.players_photo,
    ] {
        std::fs::create_dir_all(dir)?;
    }

    let day = json!([
        {
            "tournamentEventName": "Roland Garros (Paris)",
            "tournamentEventCountryISO3": "FRA",
            "tournamentEventSurfaceName": "Clay",
            "player1Name": "Alcaraz C.",
            "player1Seed": 2,
            "player1CountryISO3": "ESP",
            "player2Name": "Zverev A.",
            "player2CountryISO3": "GER",
            "result": "32",
            "resultDetails": "63 26 57 61 62",
            "player1Odds": 1.4,
            "player2Odds": 3.1
        },
        "not-an-object"
    ]);
    std::fs::write(dirs.daily.join("20250601.br"), encode(&day)?)?;
    std::fs::write(dirs.daily.join("20250530.br"), encode(&json!([]))?)?;
    std::fs::write(dirs.daily.join(format!("{}.br", CORRUPT_DAY)), b"definitely not brotli")?;
    std::fs::write(dirs.daily.join("notes.txt"), b"ignored")?;
    // eight digits but no such calendar day
    std::fs::write(dirs.daily.join("20251399.br"), encode(&json!([]))?)?;

    let upcoming = json!({ "m001": UPCOMING_MATCH, "m003": "2025-06-01T10:00:00", "m656": 0 });
    let finished = json!({ "m001": FINISHED_MATCH, "m003": "2025-06-01T10:00:00Z", "m656": 1 });
    let unscheduled = json!({ "m001": UNSCHEDULED_MATCH, "m656": null });
    for (id, doc) in [(UPCOMING_MATCH, upcoming), (FINISHED_MATCH, finished), (UNSCHEDULED_MATCH, unscheduled)] {
        std::fs::write(dirs.match_details.join(format!("{}.br", id)), encode(&doc)?)?;
    }

    std::fs::write(dirs.players_index.join("players.v2025-05-01T00-00Z.br"), b"old index")?;
    std::fs::write(dirs.players_index.join("players.v2025-06-01T00-00Z.br"), b"new index")?;

    let series = json!([{ "d": "2025-05-01", "r": 1710.5 }, { "d": "2025-06-01", "r": 1725.0 }]);
    std::fs::write(dirs.players_ts.join(format!("{}.br", PLAYER_WITH_PHOTO)), encode(&series)?)?;
    std::fs::write(dirs.players_photo.join(format!("{}.jpg", PLAYER_WITH_PHOTO)), b"player jpeg")?;
    std::fs::write(dirs.players_photo.join("photoM.jpg"), b"default men")?;
    std::fs::write(dirs.players_photo.join("photoW.jpg"), b"default women")?;

    Ok(())
}
