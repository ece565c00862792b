//! # image-dl
//!
//! HTTP service that fetches a batch of images concurrently and returns them
//! as one ZIP archive.
//!
//! ## Pipeline
//!
//! - [`filename`] derives a safe filename from each URL (unwrapping image
//!   proxy URLs, falling back to a hashed name)
//! - [`fetcher`] performs one GET per URL and streams the body to disk
//! - [`batch`] fans the fetches out as tokio tasks and joins them all
//! - [`archive`] packages the successes into a ZIP
//! - [`downloader`] runs the above for one request inside a [`scratch`]
//!   directory that is removed afterwards
//!
//! ## Quick Start
//!
//! ```no_run
//! use image_dl::{Config, ImageDownloader};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     let downloader = ImageDownloader::new(config)?;
//!
//!     let urls = vec!["https://example.com/cat.png".to_string()];
//!     let bundle = downloader.download_zip(&urls).await?;
//!     println!("{} entries, {} failed", bundle.entries.len(), bundle.error_count);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// ZIP assembly
pub mod archive;
/// Concurrent batch execution
pub mod batch;
/// Configuration types
pub mod config;
/// Request-level download service
pub mod downloader;
/// Error types
pub mod error;
/// Single-image HTTP fetch
pub mod fetcher;
/// URL to filename derivation
pub mod filename;
/// Request-scoped scratch directories
pub mod scratch;

// Re-export commonly used types
pub use batch::{BatchCoordinator, BatchResult, DownloadOutcome, DownloadTask};
pub use config::Config;
pub use downloader::{ImageDownloader, SavedManifest, ZipBundle};
pub use error::{
    ApiError, ArchiveMemberError, Error, ErrorDetail, FetchError, Result, StorageError, TaskError,
    ToHttpStatus,
};
pub use fetcher::Fetcher;
pub use filename::derive_filename;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run the HTTP service until a termination signal arrives.
///
/// Starts the scratch sweeper (if enabled) and the API server, then shuts
/// both down gracefully on a signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use image_dl::{Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///
///     // Serve with automatic signal handling
///     run_with_shutdown(config).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(config: Config) -> Result<()> {
    config.validate()?;
    let config = Arc::new(config);
    let downloader = Arc::new(ImageDownloader::new(config.clone())?);
    let shutdown = CancellationToken::new();

    let sweeper = config
        .scratch
        .sweep_enabled
        .then(|| scratch::spawn_sweeper(config.scratch.clone(), shutdown.clone()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutting down");
        signal_token.cancel();
    });

    let served = api::start_api_server(downloader, config, shutdown.clone()).await;

    // A server that failed to start must still stop the sweeper
    shutdown.cancel();
    if let Some(sweeper) = sweeper
        && let Err(e) = sweeper.await
    {
        tracing::warn!(error = %e, "scratch sweeper task failed");
    }

    served
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
