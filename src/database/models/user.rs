use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::archives::entitlement::{Account, Plan, Subscription, SubscriptionStatus};

/// Row of the `users` table, subscription and trial flattened into columns
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub plan: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription_status: String,
    pub subscription_valid_until: Option<DateTime<Utc>>,
    pub subscription_is_lifetime: bool,
    pub ads_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<User> for Account {
    fn from(user: User) -> Self {
        Account {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            plan: Plan::from_db(&user.plan),
            trial_ends_at: user.trial_ends_at,
            subscription: Subscription {
                status: SubscriptionStatus::from_db(&user.subscription_status),
                valid_until: user.subscription_valid_until,
                is_lifetime: user.subscription_is_lifetime,
            },
            ads_enabled: user.ads_enabled,
        }
    }
}
