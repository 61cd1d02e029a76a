//! Shared application state and request guards.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use usbrelay_core::RelayService;

use crate::api::blocking;
use crate::auth::ApiKeyAuth;
use crate::config::ServiceConfig;
use crate::cors::cors_layer;
use crate::error::ApiError;
use crate::rate_limit::RateLimiter;

/// State handed to every handler and middleware.
#[derive(Debug, Clone)]
pub struct AppState {
    pub relays: RelayService,
    pub auth: Arc<ApiKeyAuth>,
    pub limiter: Option<Arc<RateLimiter>>,
    pub cors: CorsLayer,
}

impl AppState {
    /// Build the state from the service configuration.
    pub fn new(relays: RelayService, config: &ServiceConfig) -> Self {
        Self {
            relays,
            auth: Arc::new(ApiKeyAuth::new(&config.api_key)),
            limiter: (config.rate_limit > 0)
                .then(|| Arc::new(RateLimiter::new(config.rate_limit))),
            cors: cors_layer(&config.cors_origins),
        }
    }
}

/// Guard rejecting the request with 503 while the device is closed.
///
/// Must come before body and path extractors so a disconnected device wins
/// over validation errors.
#[derive(Debug, Clone, Copy)]
pub struct RequireDevice;

impl FromRequestParts<AppState> for RequireDevice {
    type Rejection = ApiError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let relays = state.relays.clone();
        if blocking(move || relays.is_device_connected()).await? {
            Ok(Self)
        } else {
            Err(ApiError::device_not_connected())
        }
    }
}
