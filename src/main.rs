use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

mod config;
mod engine;
mod error;
mod journal;
mod models;
mod prober;
mod tracker;

use crate::config::MonitorConfig;
use crate::engine::Session;
use crate::journal::DowntimeLog;
use crate::models::SessionOutcome;
use crate::prober::SystemProber;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_ansi(true)
        .init();

    let config = MonitorConfig::load("config.json")?;

    let log = DowntimeLog::open(&config.log_file).await?;
    let prober = SystemProber::from_config(&config.probe, config.probe_timeout())?;
    let session = Session::start(config.target.clone(), config.interval(), prober, log).await?;

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received. Stopping downtime tracking..."),
            Err(e) => {
                warn!("Unable to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    match session.run(shutdown).await {
        SessionOutcome::Cancelled => {
            info!("Stopping the script");
            Ok(())
        }
        SessionOutcome::Faulted(e) => Err(e).context("Downtime tracking stopped after a fault"),
    }
}
