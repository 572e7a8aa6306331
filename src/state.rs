use std::sync::Arc;
use tracing::info;

use crate::archives::storage::{LocalStorage, RemoteStorage, S3ObjectStore};
use crate::archives::{clock_from_override, ArchiveGateway, ArchiveStorage, EntitlementEvaluator};
use crate::config::{AppConfig, ArchiveSource};
use crate::database::{DatabaseError, DatabaseManager, PgUserStore, UserStore};

/// Shared by every handler, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<ArchiveGateway>,
    /// None in archives-only mode
    pub users: Option<Arc<dyn UserStore>>,
}

impl AppState {
    pub fn new(config: AppConfig, gateway: ArchiveGateway, users: Option<Arc<dyn UserStore>>) -> Self {
        Self {
            config: Arc::new(config),
            gateway: Arc::new(gateway),
            users,
        }
    }

    /// Wires storage, clock and user store from configuration. Storage is picked here once.
    pub fn from_config(config: AppConfig) -> Result<Self, DatabaseError> {
        let storage: Arc<dyn ArchiveStorage> = match &config.archives.source {
            ArchiveSource::Local(dirs) => {
                info!("Local archives: daily={}", dirs.daily.display());
                Arc::new(LocalStorage::new(dirs.clone()))
            }
            ArchiveSource::Remote(remote) => Arc::new(RemoteStorage::new(Arc::new(S3ObjectStore::new(remote)))),
        };

        let clock = clock_from_override(config.archives.now_override.as_deref());
        let evaluator = EntitlementEvaluator::new(clock, config.archives.force_lock);
        let gateway = ArchiveGateway::new(storage, evaluator, config.archives.lock_hours);

        let users: Option<Arc<dyn UserStore>> = if config.archives_only {
            info!("Archives-only mode: no database, every caller is anonymous");
            None
        } else {
            let manager = DatabaseManager::connect_lazy(&config.database)?;
            Some(Arc::new(PgUserStore::new(manager.pool().clone())))
        };

        Ok(Self::new(config, gateway, users))
    }
}
