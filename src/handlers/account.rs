use axum::{extract::State, Extension};
use serde::Serialize;
use uuid::Uuid;

use crate::archives::{Account, CallerIdentity, Entitlement};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub entitlements: Entitlement,
}

/// GET /api/auth/me - current account and what it unlocks
pub async fn me(State(state): State<AppState>, Extension(account): Extension<Account>) -> ApiResult<MeResponse> {
    let entitlements = state
        .gateway
        .evaluator()
        .entitlements(&CallerIdentity::Member(account.clone()));

    Ok(ApiResponse::success(MeResponse {
        id: account.id,
        name: account.name,
        email: account.email,
        is_admin: account.is_admin,
        entitlements,
    }))
}
