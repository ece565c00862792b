//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`download`] - Batch image download
//! - [`system`] - Health, root status, OpenAPI

use serde::{Deserialize, Serialize};

mod download;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use download::*;
pub use system::*;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of POST /download
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Image URLs in the order they should appear in the result (`urls` is accepted too)
    #[serde(rename = "imageURLs", alias = "urls", default)]
    pub image_urls: Vec<String>,

    /// Subdirectory of the output directory for manifest mode
    #[serde(rename = "destDir", default, skip_serializing_if = "Option::is_none")]
    pub dest_dir: Option<String>,

    /// Return a ZIP archive (default) or keep the files and return their paths
    #[serde(rename = "zipReturn", default = "default_zip_return")]
    pub zip_return: bool,
}

fn default_zip_return() -> bool {
    true
}

/// Response of POST /download when `zipReturn` is false
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadManifest {
    /// Always true; failures are reported through the error body instead
    pub success: bool,
    /// Where each fetched image was stored
    pub saved_paths: Vec<String>,
    /// Number of URLs that could not be fetched
    pub error_count: usize,
}

/// Response of GET /health and GET /
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    /// Service status
    pub status: String,
    /// Human readable hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
