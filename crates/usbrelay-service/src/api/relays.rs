//! Relay control endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use usbrelay_core::{
    BurnTestMode, BurnTestStatus, ChannelState, DeviceInfo, RelayError, RelayStatus,
};

use crate::api::{ValidJson, blocking};
use crate::error::ApiError;
use crate::state::{AppState, RequireDevice};

/// Default delay between burn-test state changes.
pub const DEFAULT_BURN_DELAY_MS: u64 = 500;

/// Body of the `PUT` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRequest {
    pub state: ChannelState,
}

/// Response listing every channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsResponse {
    pub channels: Vec<RelayStatus>,
}

/// Body of `POST /relays/burn-test`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnTestRequest {
    /// 0 runs until stopped.
    #[serde(default)]
    pub cycles: u64,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default)]
    pub mode: BurnTestMode,
}

fn default_delay_ms() -> u64 {
    DEFAULT_BURN_DELAY_MS
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/relays", get(list_relays).put(set_all_relays))
        .route("/relays/device/info", get(device_info))
        .route(
            "/relays/burn-test",
            get(burn_test_status)
                .post(start_burn_test)
                .delete(stop_burn_test),
        )
        .route("/relays/{channel}", get(get_relay).put(set_relay))
}

/// Parse a path channel. Non-integers and values below 1 are validation
/// errors; anything else is range-checked by the orchestrator.
fn parse_channel(raw: &str, max_channels: u32) -> Result<u32, ApiError> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|e| ApiError::validation(format!("channel must be an integer: {e}")))?;
    if value < 1 {
        return Err(ApiError::validation(
            "channel must be greater than or equal to 1",
        ));
    }
    u32::try_from(value)
        .ok()
        .ok_or_else(|| RelayError::invalid_channel(value, max_channels).into())
}

async fn list_relays(
    State(state): State<AppState>,
) -> Result<Json<ChannelsResponse>, ApiError> {
    let relays = state.relays.clone();
    let channels = blocking(move || relays.get_all()).await?;
    Ok(Json(ChannelsResponse { channels }))
}

async fn set_all_relays(
    State(state): State<AppState>,
    _device: RequireDevice,
    ValidJson(request): ValidJson<StateRequest>,
) -> Result<Json<ChannelsResponse>, ApiError> {
    let relays = state.relays.clone();
    let channels = blocking(move || relays.set_all(request.state)).await??;
    Ok(Json(ChannelsResponse { channels }))
}

async fn get_relay(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<RelayStatus>, ApiError> {
    let channel = parse_channel(&raw, state.relays.channel_count())?;
    let relays = state.relays.clone();
    Ok(Json(blocking(move || relays.get(channel)).await??))
}

async fn set_relay(
    State(state): State<AppState>,
    _device: RequireDevice,
    Path(raw): Path<String>,
    ValidJson(request): ValidJson<StateRequest>,
) -> Result<Json<RelayStatus>, ApiError> {
    let channel = parse_channel(&raw, state.relays.channel_count())?;
    let relays = state.relays.clone();
    Ok(Json(blocking(move || relays.set(channel, request.state)).await??))
}

async fn device_info(State(state): State<AppState>) -> Result<Json<DeviceInfo>, ApiError> {
    let relays = state.relays.clone();
    Ok(Json(blocking(move || relays.device_info()).await?))
}

async fn start_burn_test(
    State(state): State<AppState>,
    _device: RequireDevice,
    ValidJson(request): ValidJson<BurnTestRequest>,
) -> Result<Json<BurnTestStatus>, ApiError> {
    if state.relays.burn_test_status().running {
        return Err(ApiError::Conflict(
            "Burn test is already running. Stop it first.".to_string(),
        ));
    }
    let status = state
        .relays
        .start_burn_test(request.cycles, request.delay_ms, request.mode)?;
    info!(
        cycles = request.cycles,
        delay_ms = request.delay_ms,
        mode = %request.mode,
        "Burn test requested"
    );
    Ok(Json(status))
}

async fn burn_test_status(State(state): State<AppState>) -> Json<BurnTestStatus> {
    Json(state.relays.burn_test_status())
}

async fn stop_burn_test(
    State(state): State<AppState>,
    _device: RequireDevice,
) -> Json<BurnTestStatus> {
    Json(state.relays.stop_burn_test().await)
}
