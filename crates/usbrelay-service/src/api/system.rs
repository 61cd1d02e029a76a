//! Unauthenticated health endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use usbrelay_core::WriteFailureStats;

use crate::api::blocking;
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` with the device connected, `degraded` otherwise.
    pub status: String,
    pub device_connected: bool,
    pub version: String,
    pub write_failures: WriteFailureStats,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let relays = state.relays.clone();
    let device_connected = blocking(move || relays.is_device_connected()).await?;

    Ok(Json(HealthResponse {
        status: if device_connected { "ok" } else { "degraded" }.to_string(),
        device_connected,
        version: env!("CARGO_PKG_VERSION").to_string(),
        write_failures: state.relays.write_failures(),
    }))
}
