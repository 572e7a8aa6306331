use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Wrapper for service responses that adds the `{success, data}` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        let envelope = json!({
            "success": status.is_success(),
            "data": data_value
        });

        (status, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

/// Cache-Control policies used by the archive routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Archive content, safe for shared caches for five minutes
    Public,
    /// Player rating history, refreshed at most hourly
    Hourly,
    /// Player photos
    Immutable,
    /// Lock outcomes and diagnostics, which depend on caller and clock
    NoStore,
}

impl CachePolicy {
    pub fn header_value(self) -> HeaderValue {
        match self {
            CachePolicy::Public => HeaderValue::from_static("public, max-age=300"),
            CachePolicy::Hourly => HeaderValue::from_static("public, max-age=3600"),
            CachePolicy::Immutable => HeaderValue::from_static("public, max-age=2592000, immutable"),
            CachePolicy::NoStore => HeaderValue::from_static("no-store"),
        }
    }
}

/// Bare JSON body (no envelope) with a cache policy, as archive clients expect
pub fn cached_json<T: Serialize>(status: StatusCode, body: &T, policy: CachePolicy) -> Response {
    let mut response = (status, Json(body)).into_response();
    with_cache(&mut response, policy);
    response
}

pub fn with_cache(response: &mut Response, policy: CachePolicy) {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, policy.header_value());
}
