//! HTTP routing.
//!
//! ```text
//! GET    /health
//! GET    /api/v1/relays
//! PUT    /api/v1/relays
//! GET    /api/v1/relays/device/info
//! GET    /api/v1/relays/burn-test
//! POST   /api/v1/relays/burn-test
//! DELETE /api/v1/relays/burn-test
//! GET    /api/v1/relays/{channel}
//! PUT    /api/v1/relays/{channel}
//! ```

pub mod relays;
pub mod system;

use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use axum::{Json, Router, middleware};

use crate::auth::require_api_key;
use crate::error::ApiError;
use crate::rate_limit::enforce_rate_limit;
use crate::state::AppState;

/// Prefix of the authenticated API.
pub const API_PREFIX: &str = "/api/v1";

/// Build the complete router.
///
/// CORS is the outermost layer, so preflight requests skip rate limiting and
/// authentication.
pub fn router(state: AppState) -> Router {
    let api = relays::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_api_key,
    ));

    Router::new()
        .merge(system::routes())
        .nest(API_PREFIX, api)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_rate_limit,
        ))
        .layer(state.cors.clone())
        .with_state(state)
}

/// JSON body extractor answering 422 for any malformed or missing body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::validation(rejection.body_text())),
        }
    }
}

/// Run a device-touching orchestrator call on the blocking pool.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await?)
}
