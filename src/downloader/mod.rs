//! Request-level image download service
//!
//! [`ImageDownloader`] ties the pieces together for one request: it validates
//! the URL list, runs a batch, and either packages the successes as a ZIP
//! (scratch space is gone when the call returns) or leaves them in the output
//! directory and reports where they are.

use crate::archive::assemble_zip_blocking;
use crate::batch::BatchCoordinator;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::scratch::{ScratchDir, unique_dir_name};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A finished ZIP download
#[derive(Debug)]
pub struct ZipBundle {
    /// Complete archive bytes
    pub bytes: Vec<u8>,
    /// Archive entry names in URL order
    pub entries: Vec<String>,
    /// Number of URLs that could not be fetched
    pub error_count: usize,
}

/// Where a manifest-mode download put its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedManifest {
    /// Paths of the stored images in URL order
    pub saved_paths: Vec<PathBuf>,
    /// Number of URLs that could not be fetched
    pub error_count: usize,
}

/// Main service instance (cloneable, shares one HTTP client)
#[derive(Clone, Debug)]
pub struct ImageDownloader {
    config: Arc<Config>,
    coordinator: BatchCoordinator,
}

impl ImageDownloader {
    /// Build the service; fails only if the HTTP client cannot be created
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let fetcher = Fetcher::new(&config.download)?;
        Ok(Self {
            config,
            coordinator: BatchCoordinator::new(fetcher),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch `urls` into a private scratch directory and return them as one ZIP
    ///
    /// Errors with [`Error::BatchExhausted`] when nothing could be fetched; no
    /// archive is built in that case.
    pub async fn download_zip(&self, urls: &[String]) -> Result<ZipBundle> {
        self.validate_urls(urls)?;

        let scratch = ScratchDir::create(&self.config.scratch.root).await?;
        let bundle = self.zip_batch(urls, scratch.path()).await;
        scratch.remove().await;
        let bundle = bundle?;

        info!(
            urls = urls.len(),
            entries = bundle.entries.len(),
            errors = bundle.error_count,
            "zip download complete"
        );

        Ok(bundle)
    }

    async fn zip_batch(&self, urls: &[String], scratch: &Path) -> Result<ZipBundle> {
        let result = self.coordinator.run(urls, scratch).await?;
        result.ensure_any_success()?;

        let summary = assemble_zip_blocking(result.success_paths()).await?;

        Ok(ZipBundle {
            bytes: summary.bytes,
            entries: summary.entries,
            error_count: result.failure_count(),
        })
    }

    /// Fetch `urls` into the output directory (optionally a subdirectory of it)
    ///
    /// Each call stores into its own `batch-<millis>-<seq>` directory below the
    /// resolved destination, so requests sharing a `destDir` never touch each
    /// other's files.
    pub async fn download_to_dir(
        &self,
        urls: &[String],
        dest_dir: Option<&str>,
    ) -> Result<SavedManifest> {
        self.validate_urls(urls)?;
        let dest = self.resolve_dest_dir(dest_dir)?.join(unique_dir_name());

        let result = self.coordinator.run(urls, &dest).await?;
        result.ensure_any_success()?;

        info!(
            urls = urls.len(),
            saved = result.saved.len(),
            errors = result.failure_count(),
            dest = ?dest,
            "directory download complete"
        );

        Ok(SavedManifest {
            saved_paths: result.success_paths(),
            error_count: result.failure_count(),
        })
    }

    /// Reject empty and oversized URL lists
    pub fn validate_urls(&self, urls: &[String]) -> Result<()> {
        if urls.is_empty() {
            return Err(Error::Validation("No URLs provided".to_string()));
        }

        let max = self.config.download.max_urls;
        if urls.len() > max {
            return Err(Error::Validation(format!(
                "Too many URLs: {} given, at most {} allowed",
                urls.len(),
                max
            )));
        }

        Ok(())
    }

    /// Join a caller-supplied relative directory onto the output directory
    ///
    /// Absolute paths and `..` components are rejected so a request can never
    /// write outside the output directory.
    pub fn resolve_dest_dir(&self, dest_dir: Option<&str>) -> Result<PathBuf> {
        let base = &self.config.download.output_dir;
        let Some(dest_dir) = dest_dir.map(str::trim).filter(|d| !d.is_empty()) else {
            return Ok(base.clone());
        };

        let relative = Path::new(dest_dir);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::Validation(format!(
                "destDir must be a relative path without '..': {}",
                dest_dir
            )));
        }

        Ok(base.join(relative))
    }
}
