//! Service configuration.
//!
//! Every option can be given as a `--long` flag or a `RELAY_*` environment
//! variable. Flags win over the environment.

use clap::Parser;
use clap::builder::FalseyValueParser;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;
use usbrelay_core::RelayServiceConfig;
use usbrelay_device::{DEFAULT_PRODUCT_ID, DEFAULT_VENDOR_ID};

use crate::logging::LoggingConfig;

/// Largest channel count the 1-byte channel field of the feature report allows.
pub const MAX_CHANNELS: u32 = 255;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("RELAY_CHANNELS must be between 1 and {MAX_CHANNELS}, got {0}")]
    InvalidChannels(u32),

    #[error("RELAY_HOST is not a valid IP address: {0}")]
    InvalidHost(String),

    #[error("RELAY_CORS_ORIGINS contains an invalid origin: {0:?}")]
    InvalidCorsOrigin(String),
}

/// Parse a `u16` from hex (`0x16C0`, `16c0`) or decimal (`5824`) notation.
pub fn parse_id(s: &str) -> Result<u16, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u16::from_str_radix(hex, 16)
            .map_err(|e| format!("invalid hex value '{s}': {e}"));
    }
    trimmed
        .parse::<u16>()
        .or_else(|_| u16::from_str_radix(trimmed, 16))
        .map_err(|e| format!("invalid USB id '{s}': {e}"))
}

/// USB relay REST API daemon.
#[derive(Debug, Clone, Parser)]
#[command(name = "relayd", version, about = "REST API for USB HID relay modules")]
pub struct ServiceConfig {
    /// Application name reported in logs.
    #[arg(long, env = "RELAY_APP_NAME", default_value = "Relay API")]
    pub app_name: String,

    /// Verbose logging (debug level).
    #[arg(long, env = "RELAY_DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "RELAY_LOG_JSON", value_parser = FalseyValueParser::new())]
    pub log_json: bool,

    /// Use the in-memory simulator instead of real hardware.
    #[arg(long, env = "RELAY_MOCK", value_parser = FalseyValueParser::new())]
    pub mock: bool,

    /// USB vendor ID of the relay board.
    #[arg(
        long,
        env = "RELAY_VENDOR_ID",
        value_parser = parse_id,
        default_value_t = DEFAULT_VENDOR_ID
    )]
    pub vendor_id: u16,

    /// USB product ID of the relay board.
    #[arg(
        long,
        env = "RELAY_PRODUCT_ID",
        value_parser = parse_id,
        default_value_t = DEFAULT_PRODUCT_ID
    )]
    pub product_id: u16,

    /// Number of relay channels on the board.
    #[arg(long = "channels", env = "RELAY_CHANNELS", default_value_t = 2)]
    pub channels: u32,

    /// Address to bind.
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind.
    #[arg(long, env = "RELAY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// API key required in `X-API-Key`; empty disables authentication.
    #[arg(long, env = "RELAY_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Requests per minute per client IP; 0 disables rate limiting.
    #[arg(long, env = "RELAY_RATE_LIMIT", default_value_t = 0)]
    pub rate_limit: u32,

    /// Auto-off delay in milliseconds after a channel is set ON; 0 disables.
    #[arg(long, env = "RELAY_PULSE_MS", default_value_t = 0)]
    pub pulse_ms: u64,

    /// Comma-separated origins allowed by CORS; `*` allows any.
    #[arg(long, env = "RELAY_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app_name: "Relay API".to_string(),
            debug: false,
            log_json: false,
            mock: false,
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            channels: 2,
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_key: String::new(),
            rate_limit: 0,
            pulse_ms: 0,
            cors_origins: vec![crate::cors::ANY_ORIGIN.to_string()],
        }
    }
}

impl ServiceConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel count is outside `1..=255`, the host
    /// is not an IP address or a CORS origin is not a valid header value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(ConfigError::InvalidChannels(self.channels));
        }
        self.bind_addr()?;
        if let Some(origin) = self
            .cors_origins
            .iter()
            .find(|origin| crate::cors::parse_origin(origin).is_none())
        {
            return Err(ConfigError::InvalidCorsOrigin(origin.clone()));
        }
        Ok(())
    }

    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHost`] if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| ConfigError::InvalidHost(format!("{}: {e}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Orchestrator settings.
    pub fn relay_config(&self) -> RelayServiceConfig {
        RelayServiceConfig {
            channels: self.channels,
            pulse_ms: self.pulse_ms,
        }
    }

    /// Logging settings.
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: if self.debug {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            },
            json_format: self.log_json,
        }
    }

    /// Whether API key authentication is enabled.
    pub fn auth_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}
