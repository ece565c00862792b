//! Application state for the API server

use crate::ImageDownloader;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The download service; its configuration is reachable through it
    pub downloader: Arc<ImageDownloader>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<ImageDownloader>) -> Self {
        Self { downloader }
    }
}
