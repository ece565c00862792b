//! Error types for image-dl
//!
//! This module provides error handling for the library, including:
//! - Request-level errors that abort a download request (`Error`)
//! - Per-task errors that are recorded and counted but never abort a batch
//!   (`TaskError`, `FetchError`, `StorageError`)
//! - Archive member errors that cause a single entry to be skipped
//! - HTTP status code mapping and structured JSON error bodies for the API

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for image-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for image-dl
///
/// Only errors that end a request live here. Failures of individual image
/// fetches are [`TaskError`]s and are aggregated into a count instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "PORT")
        key: Option<String>,
    },

    /// The request was rejected before any work started
    #[error("invalid request: {0}")]
    Validation(String),

    /// The scratch or output directory could not be prepared
    #[error("failed to prepare directory {path}: {source}")]
    Directory {
        /// The directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Every task in the batch failed
    #[error("no images were downloaded ({total} of {total} failed)")]
    BatchExhausted {
        /// Number of tasks in the batch
        total: usize,
    },

    /// The archive could not be written or finalized
    #[error("archive error: {0}")]
    Archive(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside of a single fetch (e.g. building the HTTP client)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Network-side failure of a single fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed
    #[error("failed to fetch URL {url}: {reason}")]
    Request {
        /// Source URL
        url: String,
        /// Underlying reason
        reason: String,
    },

    /// The fetch did not complete within the configured timeout
    #[error("timed out fetching {url} after {timeout_secs}s")]
    Timeout {
        /// Source URL
        url: String,
        /// The timeout that elapsed
        timeout_secs: u64,
    },

    /// The server answered with anything other than 200 OK
    #[error("bad status code for {url}: {status}")]
    Status {
        /// Source URL
        url: String,
        /// HTTP status code received
        status: u16,
    },

    /// The response body failed mid-transfer
    #[error("failed to read body of {url}: {reason}")]
    Body {
        /// Source URL
        url: String,
        /// Underlying reason
        reason: String,
    },

    /// The response body exceeded the configured size ceiling
    #[error("image at {url} exceeds {limit} bytes")]
    TooLarge {
        /// Source URL
        url: String,
        /// Configured ceiling in bytes
        limit: u64,
    },
}

/// Local storage failure of a single fetch
#[derive(Debug, Error)]
pub enum StorageError {
    /// The target file or its parent directory could not be created
    #[error("failed to create file {path}: {source}")]
    Create {
        /// Target location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The body could not be fully written to the target file
    #[error("failed to write image to file {path}: {source}")]
    Write {
        /// Target location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Outcome error of one download task
#[derive(Debug, Error)]
pub enum TaskError {
    /// Network-side failure
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Local storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The task panicked or was cancelled before reporting
    #[error("download task aborted: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Machine-readable error kind, used in logs and manifests
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Fetch(FetchError::Request { .. }) => "request_failed",
            TaskError::Fetch(FetchError::Timeout { .. }) => "timeout",
            TaskError::Fetch(FetchError::Status { .. }) => "bad_status",
            TaskError::Fetch(FetchError::Body { .. }) => "body_failed",
            TaskError::Fetch(FetchError::TooLarge { .. }) => "too_large",
            TaskError::Storage(_) => "storage_failed",
            TaskError::Panicked(_) => "task_aborted",
        }
    }
}

/// Reason an archive member was skipped
#[derive(Debug, Error)]
pub enum ArchiveMemberError {
    /// The file vanished or could not be opened
    #[error("cannot open {path}: {source}")]
    Open {
        /// Member location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The archive refused to start an entry for the file
    #[error("cannot create archive entry for {path}: {reason}")]
    Entry {
        /// Member location
        path: PathBuf,
        /// Reason reported by the ZIP writer
        reason: String,
    },

    /// Reading the file or writing the entry failed part way
    #[error("failed to copy {path} into archive: {source}")]
    Copy {
        /// Member location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "batch_exhausted",
///     "message": "no images were downloaded (2 of 2 failed)",
///     "details": { "total": 2, "error_count": 2 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Validation(_) => 400,
            Error::Config { .. } => 400,

            // 500 Internal Server Error - Server-side issues
            Error::Directory { .. } => 500,
            Error::BatchExhausted { .. } => 500,
            Error::Archive(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Network(_) => 502,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Directory { .. } => "directory_error",
            Error::BatchExhausted { .. } => "batch_exhausted",
            Error::Archive(_) => "archive_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::BatchExhausted { total } => Some(serde_json::json!({
                "total": total,
                "error_count": total,
            })),
            Error::Directory { path, .. } => Some(serde_json::json!({
                "path": path,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
