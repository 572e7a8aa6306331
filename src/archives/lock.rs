use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::entitlement::unlock_at;

pub const DETAILS_LOCKED_CODE: &str = "DETAILS_LOCKED";

/// Body of a 423 response for gated match details.
/// Instants are null when the document carries no usable start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedDetails {
    pub status: &'static str,
    pub code: &'static str,
    pub lock_hours: u32,
    pub expected_start_utc: Option<String>,
    pub unlocks_at: Option<String>,
    pub message: String,
}

impl LockedDetails {
    pub fn new(scheduled_start: Option<DateTime<Utc>>, lock_hours: u32) -> Self {
        let unlocks_at = scheduled_start.map(|start| iso(unlock_at(start, lock_hours)));
        let message = match &unlocks_at {
            Some(at) => format!("Match details are locked until {}.", at),
            None => "Match details are locked.".to_string(),
        };

        Self {
            status: "error",
            code: DETAILS_LOCKED_CODE,
            lock_hours,
            expected_start_utc: scheduled_start.map(iso),
            unlocks_at,
            message,
        }
    }
}

/// `2025-06-01T08:00:00.000Z`, the shape clients already parse
pub fn iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
