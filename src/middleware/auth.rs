use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::archives::{Account, CallerIdentity};
use crate::auth::validate_jwt;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the caller for gated routes. Never rejects: anything short of a
/// valid token for a known user is treated as anonymous.
pub async fn optional_auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let caller = match resolve_account(&state, request.headers()).await {
        Ok(account) => CallerIdentity::Member(account),
        Err(err) => {
            debug!("Treating caller as anonymous: {}", err);
            CallerIdentity::Anonymous
        }
    };

    request.extensions_mut().insert(caller);
    next.run(request).await
}

/// Strict variant for account routes, 401 without a valid token
pub async fn require_auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match resolve_account(&state, request.headers()).await {
        Ok(account) => {
            request.extensions_mut().insert(CallerIdentity::Member(account.clone()));
            request.extensions_mut().insert(account);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

async fn resolve_account(state: &AppState, headers: &HeaderMap) -> Result<Account, ApiError> {
    let users = state
        .users
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Accounts are disabled in archives-only mode"))?;

    let token = extract_jwt_from_headers(headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&state.config.security.jwt_secret, token)?;

    match users.find_account(claims.id).await {
        Ok(Some(account)) => Ok(account),
        Ok(None) => Err(ApiError::unauthorized("User no longer exists")),
        Err(err) => {
            warn!("User lookup failed for {}: {}", claims.id, err);
            Err(err.into())
        }
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<&str, &'static str> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err("Empty JWT token"),
        None => Err("Authorization header must use Bearer token format"),
    }
}
