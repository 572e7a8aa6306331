// handlers/mod.rs - route table
//
// Public archive reads under /api/archives (match details behind optional
// auth), plus the service banner, health and the authenticated /api/auth/me.

pub mod account;
pub mod archives;
pub mod service;

use axum::{http::HeaderValue, middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::require_auth_middleware;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let account_routes = Router::new()
        .route("/api/auth/me", get(account::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth_middleware));

    Router::new()
        .route("/", get(service::root))
        .route("/api/health", get(service::health))
        .nest("/api/archives", archives::routes(state.clone()))
        .merge(account_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.security.cors_origins)),
        )
        .with_state(state)
}

/// Empty origin list means any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
