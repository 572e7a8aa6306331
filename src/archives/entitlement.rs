use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::clock::Clock;

pub const MAX_LOCK_HOURS: u32 = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

impl Plan {
    /// Lenient mapping from the stored column, unknown values read as free
    pub fn from_db(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "premium" => Plan::Premium,
            _ => Plan::Free,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Active,
    PastDue,
    Canceled,
    Expired,
}

impl SubscriptionStatus {
    pub fn from_db(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" | "cancelled" => SubscriptionStatus::Canceled,
            "expired" => SubscriptionStatus::Expired,
            _ => SubscriptionStatus::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub status: SubscriptionStatus,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_lifetime: bool,
}

impl Subscription {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.is_lifetime {
            return true;
        }
        self.status == SubscriptionStatus::Active && self.valid_until.is_some_and(|until| until > now)
    }
}

/// The slice of a user record the gate cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub plan: Plan,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription: Subscription,
    pub ads_enabled: bool,
}

impl Account {
    /// Plain free account, mostly useful as a base for tests and fixtures
    pub fn free(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            is_admin: false,
            plan: Plan::Free,
            trial_ends_at: None,
            subscription: Subscription::default(),
            ads_enabled: true,
        }
    }

    pub fn is_premium(&self, now: DateTime<Utc>) -> bool {
        self.plan == Plan::Premium || self.subscription.is_active_at(now)
    }

    pub fn has_active_trial(&self, now: DateTime<Utc>) -> bool {
        self.trial_ends_at.is_some_and(|ends| ends > now)
    }

    pub fn tier(&self, now: DateTime<Utc>) -> AccessTier {
        if self.is_admin {
            AccessTier::Admin
        } else if self.is_premium(now) {
            AccessTier::Premium
        } else if self.has_active_trial(now) {
            AccessTier::Trialing
        } else {
            AccessTier::Free
        }
    }
}

/// Who is asking. Resolved by the auth middleware, never by the gate itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CallerIdentity {
    #[default]
    Anonymous,
    Member(Account),
}

impl CallerIdentity {
    pub fn account(&self) -> Option<&Account> {
        match self {
            CallerIdentity::Anonymous => None,
            CallerIdentity::Member(account) => Some(account),
        }
    }

    pub fn tier(&self, now: DateTime<Utc>) -> AccessTier {
        match self {
            CallerIdentity::Anonymous => AccessTier::Anonymous,
            CallerIdentity::Member(account) => account.tier(now),
        }
    }
}

/// Caller classification at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Anonymous,
    Free,
    Trialing,
    Premium,
    Admin,
}

impl AccessTier {
    pub fn bypasses_lock(&self) -> bool {
        matches!(self, AccessTier::Admin | AccessTier::Premium | AccessTier::Trialing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub plan: Plan,
    pub tier: AccessTier,
    pub is_premium: bool,
    pub has_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub show_ads: bool,
    pub can_view_locked_details: bool,
}

/// `scheduled_start - lock_hours`
pub fn unlock_at(scheduled_start: DateTime<Utc>, lock_hours: u32) -> DateTime<Utc> {
    scheduled_start - Duration::hours(i64::from(lock_hours))
}

#[derive(Debug, Clone)]
pub struct EntitlementEvaluator {
    clock: Arc<dyn Clock>,
    force_lock: bool,
}

impl EntitlementEvaluator {
    pub fn new(clock: Arc<dyn Clock>, force_lock: bool) -> Self {
        if force_lock {
            tracing::warn!("Details force-lock is enabled, every upcoming match will be locked");
        }
        Self { clock, force_lock }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn force_lock(&self) -> bool {
        self.force_lock
    }

    pub fn entitlements(&self, caller: &CallerIdentity) -> Entitlement {
        let now = self.now();
        let tier = caller.tier(now);
        let account = caller.account();

        let ads_enabled = account.map_or(true, |a| a.ads_enabled);

        Entitlement {
            plan: account.map_or(Plan::Free, |a| a.plan),
            tier,
            is_premium: account.is_some_and(|a| a.is_premium(now)),
            has_trial: account.is_some_and(|a| a.has_active_trial(now)),
            trial_ends_at: account.and_then(|a| a.trial_ends_at),
            show_ads: ads_enabled && !tier.bypasses_lock(),
            can_view_locked_details: !self.force_lock && tier.bypasses_lock(),
        }
    }

    /// Whether full details of a not-yet-finished match may be returned.
    ///
    /// Order: force-lock denies everyone (admins included), then admin,
    /// paid plan and active trial allow, then the lock window decides.
    /// A missing or unparseable start time is treated as unknown and allowed.
    pub fn can_view_details(
        &self,
        caller: &CallerIdentity,
        scheduled_start: Option<DateTime<Utc>>,
        lock_hours: u32,
    ) -> bool {
        if self.force_lock {
            return false;
        }

        let now = self.now();
        if caller.tier(now).bypasses_lock() {
            return true;
        }

        match scheduled_start {
            Some(start) => now >= unlock_at(start, lock_hours),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archives::clock::FixedClock;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, s).unwrap()
    }

    fn evaluator(now: DateTime<Utc>, force_lock: bool) -> EntitlementEvaluator {
        EntitlementEvaluator::new(Arc::new(FixedClock(now)), force_lock)
    }

    fn member(f: impl FnOnce(&mut Account)) -> CallerIdentity {
        let mut account = Account::free(Uuid::new_v4(), "tester");
        f(&mut account);
        CallerIdentity::Member(account)
    }

    #[test]
    fn anonymous_lock_window_boundary() {
        let start = Some(at(10, 0, 0));
        let anon = CallerIdentity::Anonymous;

        assert!(!evaluator(at(7, 59, 59), false).can_view_details(&anon, start, 2));
        assert!(evaluator(at(8, 0, 0), false).can_view_details(&anon, start, 2));
        assert!(evaluator(at(9, 30, 0), false).can_view_details(&anon, start, 2));
    }

    #[test]
    fn zero_lock_hours_still_hides_future_matches() {
        let anon = CallerIdentity::Anonymous;
        let start = Some(at(10, 0, 0));
        assert!(!evaluator(at(9, 59, 59), false).can_view_details(&anon, start, 0));
        assert!(evaluator(at(10, 0, 0), false).can_view_details(&anon, start, 0));
    }

    #[test]
    fn unknown_start_is_visible() {
        assert!(evaluator(at(0, 0, 0), false).can_view_details(&CallerIdentity::Anonymous, None, 2));
    }

    #[test]
    fn privileged_callers_bypass_window() {
        let eval = evaluator(at(0, 0, 0), false);
        let start = Some(at(10, 0, 0));

        let admin = member(|a| a.is_admin = true);
        let premium = member(|a| a.plan = Plan::Premium);
        let lifetime = member(|a| a.subscription.is_lifetime = true);
        let subscribed = member(|a| {
            a.subscription.status = SubscriptionStatus::Active;
            a.subscription.valid_until = Some(at(23, 0, 0));
        });
        let trialing = member(|a| a.trial_ends_at = Some(at(12, 0, 0)));

        for caller in [admin, premium, lifetime, subscribed, trialing] {
            assert!(eval.can_view_details(&caller, start, 2), "{caller:?}");
        }
    }

    #[test]
    fn lapsed_entitlements_fall_back_to_window() {
        let eval = evaluator(at(6, 0, 0), false);
        let start = Some(at(10, 0, 0));

        let expired_trial = member(|a| a.trial_ends_at = Some(at(5, 0, 0)));
        let expired_sub = member(|a| {
            a.subscription.status = SubscriptionStatus::Active;
            a.subscription.valid_until = Some(at(6, 0, 0));
        });
        let canceled = member(|a| {
            a.subscription.status = SubscriptionStatus::Canceled;
            a.subscription.valid_until = Some(at(23, 0, 0));
        });

        for caller in [expired_trial, expired_sub, canceled] {
            assert!(!eval.can_view_details(&caller, start, 2), "{caller:?}");
        }
    }

    #[test]
    fn force_lock_wins_over_admin() {
        let eval = evaluator(at(9, 0, 0), true);
        let admin = member(|a| a.is_admin = true);
        assert!(!eval.can_view_details(&admin, Some(at(10, 0, 0)), 2));
        assert!(!eval.entitlements(&admin).can_view_locked_details);
    }

    #[test]
    fn entitlement_flags() {
        let eval = evaluator(at(9, 0, 0), false);

        let anon = eval.entitlements(&CallerIdentity::Anonymous);
        assert_eq!(anon.tier, AccessTier::Anonymous);
        assert!(anon.show_ads);
        assert!(!anon.can_view_locked_details);

        let trial = eval.entitlements(&member(|a| a.trial_ends_at = Some(at(10, 0, 0))));
        assert!(trial.has_trial);
        assert!(!trial.show_ads);
        assert!(trial.can_view_locked_details);

        let no_ads = eval.entitlements(&member(|a| a.ads_enabled = false));
        assert_eq!(no_ads.tier, AccessTier::Free);
        assert!(!no_ads.show_ads);

        let sub = eval.entitlements(&member(|a| a.subscription.is_lifetime = true));
        assert!(sub.is_premium);
        assert_eq!(sub.plan, Plan::Free);
    }

    #[test]
    fn db_values_map_leniently() {
        assert_eq!(Plan::from_db("PREMIUM"), Plan::Premium);
        assert_eq!(Plan::from_db("gold"), Plan::Free);
        assert_eq!(SubscriptionStatus::from_db("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(SubscriptionStatus::from_db(""), SubscriptionStatus::None);
    }
}
