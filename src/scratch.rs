//! Per-request scratch directories and the stale-directory sweeper
//!
//! Every ZIP-mode request gets its own directory under the scratch root, so
//! concurrent requests never see each other's files. The directory is removed
//! when the request finishes, or when its [`ScratchDir`] guard is dropped.
//! Anything a crash leaves behind is picked up by [`spawn_sweeper`].

use crate::config::ScratchConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Name prefix of every directory named by [`unique_dir_name`]
pub const SCRATCH_PREFIX: &str = "batch-";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A fresh `batch-<millis>-<seq>` name, unique within this process
pub fn unique_dir_name() -> String {
    format!(
        "{}{}-{}",
        SCRATCH_PREFIX,
        chrono::Utc::now().timestamp_millis(),
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

/// A request-scoped directory
///
/// Call [`ScratchDir::remove`] when done. If the guard is dropped instead
/// (the request future was cancelled), the directory is removed synchronously.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    /// Create a fresh [`unique_dir_name`] directory under `root`
    pub async fn create(root: &Path) -> Result<Self> {
        let path = root.join(unique_dir_name());

        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| Error::Directory {
                path: path.clone(),
                source,
            })?;

        debug!(path = ?path, "created scratch directory");
        Ok(Self {
            path,
            removed: false,
        })
    }

    /// Location of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory tree without blocking the runtime
    pub async fn remove(mut self) {
        log_removal(&self.path, tokio::fs::remove_dir_all(&self.path).await);
        self.removed = true;
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.removed {
            log_removal(&self.path, std::fs::remove_dir_all(&self.path));
        }
    }
}

fn log_removal(path: &Path, outcome: std::io::Result<()>) {
    match outcome {
        Ok(()) => debug!(path = ?path, "removed scratch directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = ?path, error = %e, "failed to remove scratch directory"),
    }
}

/// Remove scratch directories under `root` last modified more than `stale_after` ago
///
/// Only entries named with [`SCRATCH_PREFIX`] are considered. Returns how
/// many directories were removed. A missing root is not an error.
pub async fn sweep_stale(root: &Path, stale_after: Duration) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(Error::Directory {
                path: root.to_path_buf(),
                source,
            });
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(SCRATCH_PREFIX) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_dir() => metadata,
            Ok(_) => continue,
            Err(e) => {
                warn!(path = ?entry.path(), error = %e, "could not stat scratch entry");
                continue;
            }
        };

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= stale_after {
            continue;
        }

        match tokio::fs::remove_dir_all(entry.path()).await {
            Ok(()) => {
                debug!(path = ?entry.path(), age_secs = age.as_secs(), "swept stale scratch directory");
                removed += 1;
            }
            Err(e) => warn!(path = ?entry.path(), error = %e, "failed to sweep scratch directory"),
        }
    }

    Ok(removed)
}

/// Spawn the periodic sweeper; it stops when `shutdown` is cancelled
pub fn spawn_sweeper(
    config: ScratchConfig,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match sweep_stale(&config.root, config.stale_after).await {
                        Ok(0) => {}
                        Ok(removed) => info!(removed, root = ?config.root, "swept stale scratch directories"),
                        Err(e) => warn!(error = %e, "scratch sweep failed"),
                    }
                }
                _ = shutdown.cancelled() => {
                    debug!("scratch sweeper stopping");
                    break;
                }
            }
        }
    })
}
