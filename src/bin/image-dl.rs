//! image-dl server
//!
//! Reads its configuration from the environment (`PORT`, `IMAGE_DL_*`),
//! logs to stderr filtered by `RUST_LOG`, and serves until SIGINT/SIGTERM.

use image_dl::{Config, run_with_shutdown};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,image_dl=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        address = %config.api.bind_address,
        scratch = ?config.scratch.root,
        max_urls = config.download.max_urls,
        "image-dl {} starting",
        env!("CARGO_PKG_VERSION")
    );

    match run_with_shutdown(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server exited with an error");
            ExitCode::FAILURE
        }
    }
}
