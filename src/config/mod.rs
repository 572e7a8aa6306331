use serde::Serialize;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::archives::entitlement::MAX_LOCK_HOURS;
use crate::archives::storage::LocalDirs;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    /// No database, every caller is anonymous
    pub archives_only: bool,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub archives: ArchivesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ArchivesConfig {
    pub source: ArchiveSource,
    pub lock_hours: u32,
    pub now_override: Option<String>,
    pub force_lock: bool,
    pub debug_routes: bool,
}

#[derive(Debug, Clone)]
pub enum ArchiveSource {
    Local(LocalDirs),
    Remote(RemoteArchiveConfig),
}

impl ArchiveSource {
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveSource::Local(_) => "local",
            ArchiveSource::Remote(_) => "remote",
        }
    }
}

#[derive(Clone)]
pub struct RemoteArchiveConfig {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for RemoteArchiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteArchiveConfig")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &"***")
            .field("secret_access_key", &"***")
            .finish()
    }
}

const MIN_JWT_SECRET_LEN: usize = 16;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match get("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let mut config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        };

        // Server
        if let Some(v) = get("BONZOBYTE_PORT").or_else(|| get("PORT")) {
            config.port = parse(&v, "PORT")?;
        }
        config.archives_only = get("ARCHIVES_ONLY").is_some_and(|v| flag(&v));

        // Database
        config.database.url = get("DATABASE_URL");
        if let Some(v) = get("DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = parse(&v, "DATABASE_MAX_CONNECTIONS")?;
        }
        if let Some(v) = get("DATABASE_CONNECTION_TIMEOUT") {
            config.database.connection_timeout = parse(&v, "DATABASE_CONNECTION_TIMEOUT")?;
        }

        // Security
        if let Some(v) = get("JWT_SECRET") {
            config.security.jwt_secret = v;
        }
        if let Some(v) = get("JWT_EXPIRES_HOURS") {
            config.security.jwt_expiry_hours = parse(&v, "JWT_EXPIRES_HOURS")?;
        }
        // Set but empty means any origin
        if let Some(v) = lookup("CORS_ORIGINS") {
            config.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if !config.archives_only {
            let mut missing = Vec::new();
            if config.database.url.is_none() {
                missing.push("DATABASE_URL");
            }
            if config.security.jwt_secret.is_empty() {
                missing.push("JWT_SECRET");
            }
            if !missing.is_empty() {
                return Err(ConfigError::Missing(missing));
            }
            if config.security.jwt_secret.len() < MIN_JWT_SECRET_LEN {
                return Err(ConfigError::Invalid {
                    var: "JWT_SECRET",
                    reason: format!("must be at least {} characters", MIN_JWT_SECRET_LEN),
                });
            }
        }

        // Archives
        config.archives.source = match get("ARCHIVES_SOURCE").map(|s| s.to_ascii_lowercase()).as_deref() {
            None | Some("remote") => ArchiveSource::Remote(remote_from(&get)?),
            Some("local") => ArchiveSource::Local(LocalDirs {
                daily: get("BROTLI_DAILY_DIR").map_or_else(|| PathBuf::from("archives/daily"), PathBuf::from),
                match_details: get("BROTLI_MATCH_DETAILS_DIR")
                    .map_or_else(|| PathBuf::from("archives/matches"), PathBuf::from),
                players_index: get("BROTLI_PLAYERS_INDEX_DIR")
                    .map_or_else(|| PathBuf::from("archives/players/indexBuild"), PathBuf::from),
                tournaments_index: get("BROTLI_TOURNAMENTS_INDEX_DIR")
                    .map_or_else(|| PathBuf::from("archives/tournaments/indexBuild"), PathBuf::from),
                players_ts: get("BROTLI_PLAYERS_TS_DIR")
                    .map_or_else(|| PathBuf::from("archives/players/ts"), PathBuf::from),
                players_photo: get("PLAYERS_PHOTO_DIR")
                    .map_or_else(|| PathBuf::from("archives/players/photo"), PathBuf::from),
            }),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "ARCHIVES_SOURCE",
                    reason: format!("expected 'remote' or 'local', got '{}'", other),
                })
            }
        };

        if let Some(v) = get("DETAILS_LOCK_HOURS") {
            let hours: u32 = parse(&v, "DETAILS_LOCK_HOURS")?;
            if hours > MAX_LOCK_HOURS {
                return Err(ConfigError::Invalid {
                    var: "DETAILS_LOCK_HOURS",
                    reason: format!("must be between 0 and {}", MAX_LOCK_HOURS),
                });
            }
            config.archives.lock_hours = hours;
        }
        config.archives.now_override = get("ARCHIVES_NOW_ISO");
        config.archives.force_lock = get("DETAILS_LOCK_TEST_MODE").is_some_and(|v| flag(&v));
        if let Some(v) = get("ARCHIVES_DEBUG_ROUTES") {
            config.archives.debug_routes = flag(&v);
        }

        Ok(config)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            port: 5000,
            archives_only: false,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["http://localhost:4200".to_string()],
            },
            archives: ArchivesConfig::defaults(true),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            port: 5000,
            archives_only: false,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.bonzobyte.com".to_string()],
            },
            archives: ArchivesConfig::defaults(true),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            port: 5000,
            archives_only: false,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://bonzobyte.com".to_string()],
            },
            archives: ArchivesConfig::defaults(false),
        }
    }
}

impl ArchivesConfig {
    fn defaults(debug_routes: bool) -> Self {
        Self {
            source: ArchiveSource::Local(LocalDirs::under("archives")),
            lock_hours: 2,
            now_override: None,
            force_lock: false,
            debug_routes,
        }
    }
}

fn remote_from(get: &impl Fn(&str) -> Option<String>) -> Result<RemoteArchiveConfig, ConfigError> {
    let bucket = get("R2_BUCKET");
    let endpoint = get("R2_ENDPOINT")
        .or_else(|| get("R2_ACCOUNT_ID").map(|id| format!("https://{}.r2.cloudflarestorage.com", id)));
    let access_key_id = get("R2_ACCESS_KEY_ID");
    let secret_access_key = get("R2_SECRET_ACCESS_KEY");

    let mut missing = Vec::new();
    if bucket.is_none() {
        missing.push("R2_BUCKET");
    }
    if endpoint.is_none() {
        missing.push("R2_ENDPOINT (or R2_ACCOUNT_ID)");
    }
    if access_key_id.is_none() {
        missing.push("R2_ACCESS_KEY_ID");
    }
    if secret_access_key.is_none() {
        missing.push("R2_SECRET_ACCESS_KEY");
    }

    match (bucket, endpoint, access_key_id, secret_access_key) {
        (Some(bucket), Some(endpoint), Some(access_key_id), Some(secret_access_key)) => {
            url::Url::parse(&endpoint).map_err(|e| ConfigError::Invalid {
                var: "R2_ENDPOINT",
                reason: e.to_string(),
            })?;
            Ok(RemoteArchiveConfig {
                bucket,
                endpoint,
                access_key_id,
                secret_access_key,
            })
        }
        _ => Err(ConfigError::Missing(missing)),
    }
}

fn parse<T: std::str::FromStr>(value: &str, var: &'static str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: format!("'{}': {}", value, e),
    })
}

fn flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
