use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::{json, Value};

use crate::middleware::ApiResponse;
use crate::state::AppState;

/// GET / - service banner
pub async fn root(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "BonzoByte API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "archivesOnly": state.config.archives_only,
        "archiveSource": state.gateway.source(),
        "endpoints": {
            "archives": "/api/archives/* (public, match details gated)",
            "health": "/api/health (public)",
            "me": "/api/auth/me (requires bearer token)",
        }
    }))
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();

    let Some(users) = &state.users else {
        return ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "disabled"
        }));
    };

    match users.health_check().await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok"
        })),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            ApiResponse::with_status(
                json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}
