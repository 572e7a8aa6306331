// handlers/archives.rs - /api/archives/* handlers
//
// Archive clients consume bare JSON bodies, so these routes skip the
// `{success, data}` envelope used by the service routes.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use serde::Deserialize;

use crate::archives::clock::ClockSnapshot;
use crate::archives::gateway::INDEX_CONTENT_TYPE;
use crate::archives::{CallerIdentity, IndexEntity, MatchDetails, PhotoGender, PlayerPhoto};
use crate::error::ApiError;
use crate::middleware::{cached_json, optional_auth_middleware, with_cache, CachePolicy};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let gated = Router::new()
        .route("/match-details/:id", get(match_details))
        .route("/matches/:id", get(match_details))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth_middleware));

    let mut router = Router::new()
        .route("/available-dates", get(available_dates))
        .route("/daterange", get(date_range))
        .route("/daily/index.json", get(date_range))
        .route("/latest-daily", get(latest_daily))
        .route("/daily/:date", get(daily))
        .route("/ts/:player_tp_id", get(player_time_series))
        .route("/players/photo/:id", get(player_photo))
        .route("/status", get(status))
        .merge(gated);

    // Spelled out per entity so `/players/...` routes never overlap a `/:entity` segment
    for entity in [IndexEntity::Players, IndexEntity::Tournaments] {
        router = router
            .route(
                &format!("/{}/manifest", entity),
                get(move |state: State<AppState>| manifest(state, entity)),
            )
            .route(
                &format!("/{}/index/:file", entity),
                get(move |state: State<AppState>, file: Path<String>| index_file(state, entity, file)),
            );
    }

    if state.config.archives.debug_routes {
        router = router
            .route("/debug/now", get(debug_now))
            .route("/debug/lock/:id", get(debug_lock));
    }

    router
}

/// GET /api/archives/available-dates
pub async fn available_dates(State(state): State<AppState>) -> Result<Response, ApiError> {
    let dates = state.gateway.list_available_dates().await?;
    Ok(cached_json(StatusCode::OK, &dates, CachePolicy::Public))
}

/// GET /api/archives/daterange and /api/archives/daily/index.json
pub async fn date_range(State(state): State<AppState>) -> Result<Response, ApiError> {
    let range = state
        .gateway
        .date_range()
        .await?
        .ok_or_else(|| ApiError::not_found("No daily archives found."))?;
    Ok(cached_json(StatusCode::OK, &range, CachePolicy::Public))
}

/// GET /api/archives/latest-daily
pub async fn latest_daily(State(state): State<AppState>) -> Result<Response, ApiError> {
    let latest = state
        .gateway
        .latest_daily()
        .await?
        .ok_or_else(|| ApiError::not_found("No daily archives found."))?;
    Ok(cached_json(StatusCode::OK, &latest, CachePolicy::Public))
}

/// GET /api/archives/daily/:date
pub async fn daily(State(state): State<AppState>, Path(date): Path<String>) -> Result<Response, ApiError> {
    let matches = state.gateway.get_daily_matches(&date).await?;
    Ok(cached_json(StatusCode::OK, &matches, CachePolicy::Public))
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailsQuery {
    pub download: Option<String>,
}

impl DetailsQuery {
    fn wants_download(&self) -> bool {
        self.download.as_deref().is_some_and(|v| v.eq_ignore_ascii_case("1"))
    }
}

/// GET /api/archives/match-details/:id (and the legacy /matches/:id)
///
/// Returns the stored document verbatim, or 423 with the unlock instant when
/// the caller may not see it yet.
pub async fn match_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DetailsQuery>,
    caller: Option<Extension<CallerIdentity>>,
) -> Result<Response, ApiError> {
    let caller = caller.map(|Extension(c)| c).unwrap_or_default();

    match state.gateway.get_match_details(&id, &caller).await? {
        MatchDetails::Locked(locked) => Ok(cached_json(StatusCode::LOCKED, &locked, CachePolicy::NoStore)),
        MatchDetails::Visible { text, .. } => {
            let mut response = Response::new(Body::from(text));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            );
            if query.wants_download() {
                let disposition = format!("attachment; filename=\"{}.json\"", id.trim());
                if let Ok(value) = HeaderValue::from_str(&disposition) {
                    response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
                }
            }
            with_cache(&mut response, CachePolicy::Public);
            Ok(response)
        }
    }
}

/// GET /api/archives/{players,tournaments}/manifest
pub async fn manifest(State(state): State<AppState>, entity: IndexEntity) -> Result<Response, ApiError> {
    let manifest = state.gateway.get_manifest(entity).await?;
    Ok(cached_json(StatusCode::OK, &manifest, CachePolicy::Public))
}

/// GET /api/archives/{players,tournaments}/index/:file, raw brotli bytes
pub async fn index_file(
    State(state): State<AppState>,
    entity: IndexEntity,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.gateway.read_index(entity, &file).await?;

    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static(INDEX_CONTENT_TYPE))],
        bytes,
    )
        .into_response();
    with_cache(&mut response, CachePolicy::Public);
    Ok(response)
}

/// GET /api/archives/ts/:player_tp_id
pub async fn player_time_series(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let series = state.gateway.get_player_time_series(&id).await?;
    Ok(cached_json(StatusCode::OK, &series, CachePolicy::Hourly))
}

#[derive(Debug, Default, Deserialize)]
pub struct PhotoQuery {
    pub g: Option<String>,
}

/// GET /api/archives/players/photo/:id
///
/// Players without a photo are redirected (302) to `photoM.jpg` or
/// `photoW.jpg` depending on `?g=`.
pub async fn player_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PhotoQuery>,
) -> Result<Response, ApiError> {
    let gender = PhotoGender::from_query(query.g.as_deref());

    match state.gateway.get_player_photo(&id, gender).await? {
        PlayerPhoto::Found(bytes) => {
            let mut response = (
                [(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"))],
                bytes,
            )
                .into_response();
            with_cache(&mut response, CachePolicy::Immutable);
            Ok(response)
        }
        PlayerPhoto::Fallback(gender) => {
            let location = format!("/api/archives/players/photo/{}", gender.default_photo());
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
    }
}

/// GET /api/archives/status
pub async fn status(State(state): State<AppState>) -> Result<Response, ApiError> {
    let status = state.gateway.status().await?;
    Ok(cached_json(StatusCode::OK, &status, CachePolicy::NoStore))
}

/// GET /api/archives/debug/now
pub async fn debug_now(State(state): State<AppState>) -> Response {
    let snapshot = ClockSnapshot::capture(state.gateway.evaluator().clock());
    cached_json(StatusCode::OK, &snapshot, CachePolicy::NoStore)
}

/// GET /api/archives/debug/lock/:id
pub async fn debug_lock(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let probe = state.gateway.lock_probe(&id).await?;
    Ok(cached_json(StatusCode::OK, &probe, CachePolicy::NoStore))
}
