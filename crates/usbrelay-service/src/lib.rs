//! USB relay REST API daemon.
//!
//! Exposes a [`usbrelay_core::RelayService`] over HTTP with optional API key
//! authentication, per-client rate limiting and CORS.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod auth;
pub mod config;
pub mod cors;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod rate_limit;
pub mod state;

pub use api::router;
pub use config::{ConfigError, ServiceConfig};
pub use daemon::RelayDaemon;
pub use error::ApiError;
pub use logging::{LoggingConfig, init_logging};
pub use state::AppState;
