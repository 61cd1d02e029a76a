//! Cross-origin resource sharing.

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Origin entry allowing every origin.
pub const ANY_ORIGIN: &str = "*";

/// Parse one configured origin. Empty entries are rejected.
pub fn parse_origin(origin: &str) -> Option<HeaderValue> {
    let origin = origin.trim();
    if origin.is_empty() {
        return None;
    }
    HeaderValue::from_str(origin).ok()
}

/// CORS layer allowing any method and header from `origins`.
///
/// A `*` entry allows every origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin.trim() == ANY_ORIGIN) {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| parse_origin(o)).collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
