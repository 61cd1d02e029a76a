//! Error types for the relay orchestrator.
//!
//! Relay I/O failures keep their own type, [`RelayError`], so that callers can
//! match on it directly. [`CoreError`] covers configuration and burn-test
//! parameter problems on top of that.

use thiserror::Error;
use usbrelay_device::RelayError;

/// Errors raised by orchestrator setup and burn-test control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Invalid orchestrator configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Burn-test delay outside the accepted range.
    #[error("Burn test delay {delay_ms} ms is outside [{min_ms}, {max_ms}] ms")]
    InvalidDelay {
        /// Requested delay.
        delay_ms: u64,
        /// Smallest accepted delay.
        min_ms: u64,
        /// Largest accepted delay.
        max_ms: u64,
    },

    /// A relay operation failed.
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl CoreError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    /// Create an invalid burn-test delay error.
    #[must_use]
    pub fn invalid_delay(delay_ms: u64) -> Self {
        Self::InvalidDelay {
            delay_ms,
            min_ms: crate::burn_test::MIN_DELAY_MS,
            max_ms: crate::burn_test::MAX_DELAY_MS,
        }
    }
}

/// A specialized `Result` type for orchestrator setup and control.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
