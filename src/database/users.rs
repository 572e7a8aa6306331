use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::user::User;
use crate::archives::entitlement::Account;

/// Account lookup used to resolve bearer tokens into callers
#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Ok(None)` when the user does not exist or was deleted
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, is_admin, plan, trial_ends_at,
                   subscription_status, subscription_valid_until, subscription_is_lifetime,
                   ads_enabled, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user.map(Account::from))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// In-process store for tests and local tooling
#[derive(Default)]
pub struct MemoryUserStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        for account in accounts {
            store.insert(account);
        }
        store
    }

    pub fn insert(&self, account: Account) {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        accounts.insert(account.id, account);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.get(&id).cloned())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
