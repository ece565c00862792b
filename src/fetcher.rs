//! Single-image fetch worker
//!
//! One [`Fetcher::fetch_to`] call performs exactly one GET and streams the
//! body into the target file. Every failure is returned as a [`TaskError`];
//! nothing escapes as a panic and nothing is retried.

use crate::config::DownloadConfig;
use crate::error::{FetchError, Result, StorageError, TaskError};
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// HTTP fetcher shared by all tasks of all batches
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: Option<u64>,
}

impl Fetcher {
    /// Build a fetcher from the download settings
    ///
    /// The client timeout covers connecting, sending, and reading the full body.
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            timeout: config.fetch_timeout,
            max_bytes: config.max_image_bytes,
        })
    }

    /// Fetch `url` and store its body at `target`
    ///
    /// Returns the number of bytes written. The parent directory of `target`
    /// must already exist; it is never created here. On a storage or body
    /// failure a partial file may remain at `target`; callers must not treat it
    /// as a success.
    pub async fn fetch_to(&self, url: &str, target: &Path) -> std::result::Result<u64, TaskError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        if let Some(limit) = self.max_bytes
            && let Some(length) = response.content_length()
            && length > limit
        {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit,
            }
            .into());
        }

        let mut file = fs::File::create(target)
            .await
            .map_err(|source| StorageError::Create {
                path: target.to_path_buf(),
                source,
            })?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error(url)
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })? {
            written += chunk.len() as u64;
            if let Some(limit) = self.max_bytes
                && written > limit
            {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit,
                }
                .into());
            }

            file.write_all(&chunk)
                .await
                .map_err(|source| StorageError::Write {
                    path: target.to_path_buf(),
                    source,
                })?;
        }

        file.flush().await.map_err(|source| StorageError::Write {
            path: target.to_path_buf(),
            source,
        })?;

        debug!(url, bytes = written, path = ?target, "image stored");
        Ok(written)
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            self.timeout_error(url)
        } else if e.is_connect() {
            FetchError::Request {
                url: url.to_string(),
                reason: format!("connection failed: {}", e),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    fn timeout_error(&self, url: &str) -> FetchError {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_secs: self.timeout.as_secs(),
        }
    }
}
