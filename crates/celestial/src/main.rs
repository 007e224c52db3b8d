//! Celestial: webcam capture with minute-aligned segment upload, a WebSocket
//! live relay with its camera producer, and an HTTP frame receiver with its
//! batch sender.

mod batch;
mod config;
mod error;
mod monitor;
mod run_mode;
mod server;
mod shutdown;
mod stream;

pub(crate) use {
    error::{AppError, Result as AppResult},
    run_mode::RunMode,
};

use crate::config::Config;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "celestial=debug,celestial_core=debug";

const USAGE: &str = "Usage: celestial <relay|receiver|monitor|stream|batch>";

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let mode = match std::env::args().nth(1).as_deref().and_then(RunMode::parse) {
        Some(mode) => mode,
        None => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    info!(%mode, "Starting celestial");

    if let Err(e) = rt.block_on(run(mode, &config)) {
        error!(error = ?e, %mode, "Celestial exited with error");
        std::process::exit(1);
    }
}

async fn run(mode: RunMode, config: &Config) -> AppResult<()> {
    match mode {
        RunMode::Relay => server::run_relay(&config.relay).await,
        RunMode::Receiver => server::run_receiver(&config.receiver).await,
        RunMode::Monitor => monitor::run_monitor(&config.camera, &config.monitor).await,
        RunMode::Stream => stream::run_stream(&config.camera, &config.stream).await,
        RunMode::Batch => batch::run_batch(&config.camera, &config.batch).await,
    }
}
