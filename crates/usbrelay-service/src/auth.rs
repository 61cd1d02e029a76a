//! API key authentication.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Configured API key. An empty key disables authentication.
#[derive(Clone, Default)]
pub struct ApiKeyAuth {
    key: Option<Vec<u8>>,
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl ApiKeyAuth {
    pub fn new(key: &str) -> Self {
        Self {
            key: (!key.is_empty()).then(|| key.as_bytes().to_vec()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Constant-time check of a presented key.
    pub fn verify(&self, presented: Option<&[u8]>) -> bool {
        match (&self.key, presented) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(expected), Some(presented)) => expected.as_slice().ct_eq(presented).into(),
        }
    }
}

/// Middleware rejecting requests without a valid `X-API-Key`.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| value.as_bytes());

    if !state.auth.verify(presented) {
        warn!(
            path = %request.uri().path(),
            key_present = presented.is_some(),
            "Rejected request with invalid API key"
        );
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}
