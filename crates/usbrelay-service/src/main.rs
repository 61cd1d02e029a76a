//! Relay daemon (relayd)

use anyhow::Result;
use clap::Parser;
use usbrelay_service::{RelayDaemon, ServiceConfig, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::parse();
    init_logging(config.logging())?;

    RelayDaemon::new(config)?.run().await
}
