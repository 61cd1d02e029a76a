//! HTTP error responses.
//!
//! Every error is rendered as `{"detail": "..."}` with the matching status.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use usbrelay_core::CoreError;
use usbrelay_device::RelayError;

/// Detail message for the 503 answered when the device is closed.
pub const DEVICE_NOT_CONNECTED: &str = "USB relay device is not connected";

/// Errors returned by API handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed path, query or body.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid or missing API key")]
    Unauthorized,

    /// Channel outside the configured range.
    #[error("{0}")]
    NotFound(String),

    /// Burn test already running.
    #[error("{0}")]
    Conflict(String),

    #[error("Rate limit exceeded")]
    RateLimited {
        /// Seconds until the client may retry.
        retry_after: u64,
    },

    /// Device write failed.
    #[error("{0}")]
    BadGateway(String),

    /// Device not connected or not found.
    #[error("{0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn device_not_connected() -> Self {
        Self::Unavailable(DEVICE_NOT_CONNECTED.to_string())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::InvalidChannel { .. } => Self::NotFound(err.to_string()),
            RelayError::DeviceCommunication(message) => Self::BadGateway(message),
            RelayError::DeviceNotFound { .. } => Self::Unavailable(err.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Relay(relay) => relay.into(),
            CoreError::InvalidDelay { .. } => Self::Validation(err.to_string()),
            CoreError::InvalidConfiguration(message) => Self::Internal(message),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::BadGateway(_) | Self::Internal(_) => {
                error!(status = %status, error = %self, "Request failed");
            }
            Self::Unavailable(_) => warn!(status = %status, error = %self, "Request failed"),
            _ => {}
        }

        let retry_after = match &self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        };

        let mut response = (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response();

        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}
