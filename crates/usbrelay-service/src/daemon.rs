//! Process lifecycle: driver setup, HTTP serving and graceful shutdown.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use usbrelay_core::{RelayService, TracingAuditSink};
use usbrelay_device::{HidRelayDevice, RelayDevice, SimulatedRelayDevice};

use crate::api::router;
use crate::config::ServiceConfig;
use crate::state::AppState;

/// The relay daemon.
#[derive(Debug)]
pub struct RelayDaemon {
    config: ServiceConfig,
}

impl RelayDaemon {
    /// Create a daemon from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        Ok(Self { config })
    }

    /// Build the orchestrator around an opened (or disconnected) driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the orchestrator rejects the configuration.
    pub fn build_service(&self) -> Result<RelayService> {
        let driver = build_driver(&self.config);
        let connected = driver.is_open();

        let relays = RelayService::new(
            driver,
            self.config.relay_config(),
            Arc::new(TracingAuditSink),
            tokio::runtime::Handle::current(),
        )?;

        if connected {
            relays.all_off();
        }
        Ok(relays)
    }

    /// Serve until SIGINT/SIGTERM, then shut the relays down.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the server fails.
    pub async fn run(self) -> Result<()> {
        let config = &self.config;
        info!(
            app = %config.app_name,
            version = env!("CARGO_PKG_VERSION"),
            "Starting relay daemon"
        );

        let service = self.build_service()?;
        let relays = service.clone();
        let setup = tokio::task::spawn_blocking(move || relays.device_info()).await?;
        info!(
            manufacturer = %setup.manufacturer,
            product = %setup.product,
            channels = setup.channels,
            connected = setup.connected,
            "Relay device ready"
        );

        info!(enabled = config.auth_enabled(), "API key authentication");
        info!(
            enabled = config.rate_limit > 0,
            requests_per_minute = config.rate_limit,
            "Rate limiting"
        );
        info!(
            enabled = config.pulse_ms > 0,
            pulse_ms = config.pulse_ms,
            "Pulse mode"
        );
        info!(origins = ?config.cors_origins, "CORS");

        let addr = config.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(%addr, "Listening");

        let app = router(AppState::new(service.clone(), config));
        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        info!("Shutting down relays");
        service.shutdown().await;

        served.context("HTTP server failed")?;
        info!("Relay daemon stopped");
        Ok(())
    }
}

/// Simulator when `mock` is set, the HID driver otherwise. Opening failures
/// leave the driver closed and the daemon in disconnected mode.
pub fn build_driver(config: &ServiceConfig) -> Box<dyn RelayDevice> {
    let mut driver: Box<dyn RelayDevice> = if config.mock {
        info!(channels = config.channels, "Using simulated relay device");
        Box::new(SimulatedRelayDevice::new(config.channels))
    } else {
        Box::new(HidRelayDevice::new(config.vendor_id, config.product_id))
    };

    match driver.open() {
        Ok(()) => info!(
            vendor_id = format_args!("{:#06x}", config.vendor_id),
            product_id = format_args!("{:#06x}", config.product_id),
            "Relay device opened"
        ),
        Err(e) => warn!(
            error = %e,
            "Relay device unavailable, running in disconnected mode"
        ),
    }
    driver
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to install signal handlers");
                std::future::pending::<()>().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C"),
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_driver_is_opened() {
        let config = ServiceConfig {
            mock: true,
            channels: 4,
            ..ServiceConfig::default()
        };
        let driver = build_driver(&config);
        assert!(driver.is_open());
        assert_eq!(driver.manufacturer(), "MockManufacturer");
    }

    #[tokio::test]
    async fn test_build_service_switches_everything_off() -> Result<()> {
        let daemon = RelayDaemon::new(ServiceConfig {
            mock: true,
            channels: 3,
            ..ServiceConfig::default()
        })?;
        let service = daemon.build_service()?;
        assert!(service.is_device_connected());
        assert_eq!(service.channel_count(), 3);
        assert!(service.get_all().iter().all(|s| !s.state.is_on()));
        Ok(())
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_missing_hardware_leaves_driver_closed() {
        let config = ServiceConfig {
            // Nothing enumerates with these ids.
            vendor_id: 0xFFFE,
            product_id: 0xFFFE,
            ..ServiceConfig::default()
        };
        let driver = build_driver(&config);
        assert!(!driver.is_open());
        assert!(logs_contain("disconnected mode"));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(
            RelayDaemon::new(ServiceConfig {
                channels: 0,
                ..ServiceConfig::default()
            })
            .is_err()
        );
    }
}
