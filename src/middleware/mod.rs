pub mod auth;
pub mod response;

pub use auth::{optional_auth_middleware, require_auth_middleware};
pub use response::{cached_json, with_cache, ApiResponse, ApiResult, CachePolicy};
