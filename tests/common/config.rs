//! Test configuration helpers and a running server instance

use image_dl::{Config, ImageDownloader};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Config whose scratch and output directories live under `root`
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.scratch.root = root.join("scratch");
    config.scratch.sweep_enabled = false;
    config.download.output_dir = root.join("out");
    config.download.fetch_timeout = Duration::from_secs(5);
    config
}

/// A server bound to an ephemeral port, stopped on drop
pub struct TestServer {
    /// Address the server listens on
    pub addr: SocketAddr,
    /// Keeps the scratch and output directories alive
    pub temp_dir: TempDir,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<image_dl::Result<()>>>,
}

impl TestServer {
    /// Start a server with default test settings
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a server after letting `customize` adjust the config
    pub async fn start_with(customize: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let mut config = test_config(temp_dir.path());
        customize(&mut config);
        let config = Arc::new(config);

        let downloader =
            Arc::new(ImageDownloader::new(config.clone()).expect("downloader should build"));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(image_dl::api::serve_on(
            listener,
            downloader,
            config,
            shutdown.clone(),
        ));

        Self {
            addr,
            temp_dir,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Absolute URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Scratch root used by this server
    pub fn scratch_root(&self) -> PathBuf {
        self.temp_dir.path().join("scratch")
    }

    /// Output directory used by this server
    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("out")
    }

    /// Stop the server and wait for it to finish
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("server should stop")
                .expect("server task should not panic")
                .expect("server should exit cleanly");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
