//! Batch coordination: fan out one fetch per URL, join all, aggregate
//!
//! Every URL becomes a [`DownloadTask`] with its own storage location
//! (`<dest>/<index>/<filename>`), so two URLs deriving the same filename never
//! share a file. Task directories are created before any fetch starts, so a
//! destination removed mid-batch stays removed. All tasks are spawned onto the
//! runtime at once and joined before any result is inspected; each task
//! reports exactly one `Result`.

use crate::error::{Error, Result, TaskError};
use crate::fetcher::Fetcher;
use crate::filename::derive_filename;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One URL's unit of work, fixed before any fetch starts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    /// Position of the URL in the request
    pub index: usize,
    /// Source URL as received
    pub url: String,
    /// Derived filename (may collide with other tasks)
    pub filename: String,
    /// Storage location owned by this task
    pub path: PathBuf,
}

/// What one task reported
#[derive(Debug)]
pub struct DownloadOutcome {
    /// The task that ran
    pub task: DownloadTask,
    /// Bytes written, or why the task failed
    pub result: std::result::Result<u64, TaskError>,
}

/// A task that fetched and stored its image
#[derive(Clone, Debug)]
pub struct SavedImage {
    /// Position of the URL in the request
    pub index: usize,
    /// Source URL
    pub url: String,
    /// Derived filename
    pub filename: String,
    /// Where the image was stored
    pub path: PathBuf,
    /// Size of the stored image
    pub bytes: u64,
}

/// A task that failed
#[derive(Debug)]
pub struct FailedImage {
    /// Position of the URL in the request
    pub index: usize,
    /// Source URL
    pub url: String,
    /// Location the task was writing to (may hold a partial file)
    pub path: PathBuf,
    /// Why it failed
    pub error: TaskError,
}

/// Aggregated outcome of one batch
///
/// `saved.len() + failed.len()` always equals the number of tasks. Both lists
/// are ordered by request index.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Tasks that completed without error
    pub saved: Vec<SavedImage>,
    /// Tasks that reported an error
    pub failed: Vec<FailedImage>,
}

impl BatchResult {
    /// Split outcomes into successes and failures, keeping index order
    pub fn from_outcomes(outcomes: Vec<DownloadOutcome>) -> Self {
        let mut result = BatchResult::default();
        for DownloadOutcome { task, result: outcome } in outcomes {
            match outcome {
                Ok(bytes) => result.saved.push(SavedImage {
                    index: task.index,
                    url: task.url,
                    filename: task.filename,
                    path: task.path,
                    bytes,
                }),
                Err(error) => result.failed.push(FailedImage {
                    index: task.index,
                    url: task.url,
                    path: task.path,
                    error,
                }),
            }
        }
        result
    }

    /// Number of tasks in the batch
    pub fn total(&self) -> usize {
        self.saved.len() + self.failed.len()
    }

    /// Number of tasks that failed
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Storage locations of every saved image
    pub fn success_paths(&self) -> Vec<PathBuf> {
        self.saved.iter().map(|s| s.path.clone()).collect()
    }

    /// Fail with [`Error::BatchExhausted`] when nothing was saved
    pub fn ensure_any_success(&self) -> Result<()> {
        if self.saved.is_empty() {
            return Err(Error::BatchExhausted {
                total: self.total(),
            });
        }
        Ok(())
    }
}

/// Derive filenames and storage locations for `urls` under `dest`
pub fn plan_tasks(urls: &[String], dest: &Path) -> Vec<DownloadTask> {
    urls.iter()
        .enumerate()
        .map(|(index, url)| {
            let filename = derive_filename(url);
            let path = dest.join(index.to_string()).join(&filename);
            DownloadTask {
                index,
                url: url.clone(),
                filename,
                path,
            }
        })
        .collect()
}

/// Runs batches of fetches
#[derive(Clone, Debug)]
pub struct BatchCoordinator {
    fetcher: Fetcher,
}

impl BatchCoordinator {
    /// Create a coordinator using `fetcher` for every task
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch every URL into `dest` and report once all tasks have settled
    ///
    /// Fails only if `dest` or a task directory cannot be created; that
    /// happens before any fetch starts. Individual fetch failures end up in
    /// [`BatchResult::failed`].
    pub async fn run(&self, urls: &[String], dest: &Path) -> Result<BatchResult> {
        create_dir(dest).await?;

        let tasks = plan_tasks(urls, dest);
        for task in &tasks {
            if let Some(task_dir) = task.path.parent() {
                create_dir(task_dir).await?;
            }
        }
        info!(tasks = tasks.len(), dest = ?dest, "starting batch");

        let handles: Vec<_> = tasks
            .iter()
            .map(|task| {
                let fetcher = self.fetcher.clone();
                let url = task.url.clone();
                let path = task.path.clone();
                tokio::spawn(async move { fetcher.fetch_to(&url, &path).await })
            })
            .collect();

        let joined = join_all(handles).await;

        let outcomes: Vec<DownloadOutcome> = tasks
            .into_iter()
            .zip(joined)
            .map(|(task, joined)| DownloadOutcome {
                task,
                result: joined.unwrap_or_else(|e| Err(TaskError::Panicked(e.to_string()))),
            })
            .collect();

        let result = BatchResult::from_outcomes(outcomes);

        for failed in &result.failed {
            warn!(
                index = failed.index,
                url = %failed.url,
                kind = failed.error.kind(),
                error = %failed.error,
                "image download failed"
            );
        }
        discard_partial_files(&result.failed).await;

        info!(
            saved = result.saved.len(),
            failed = result.failure_count(),
            "batch finished"
        );
        Ok(result)
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| Error::Directory {
            path: path.to_path_buf(),
            source,
        })
}

/// Remove whatever failed tasks left behind, best effort
pub(crate) async fn discard_partial_files(failed: &[FailedImage]) {
    for image in failed {
        match tokio::fs::remove_file(&image.path).await {
            Ok(()) => debug!(path = ?image.path, "removed partial file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?image.path, error = %e, "could not remove partial file"),
        }
        if let Some(parent) = image.path.parent() {
            // Only succeeds when the task directory is empty
            tokio::fs::remove_dir(parent).await.ok();
        }
    }
}
