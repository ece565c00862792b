//! Configuration types for image-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Environment variable selecting the listen port
pub const ENV_PORT: &str = "PORT";
/// Environment variable overriding the scratch root
pub const ENV_SCRATCH_DIR: &str = "IMAGE_DL_SCRATCH_DIR";
/// Environment variable overriding the manifest output root
pub const ENV_OUTPUT_DIR: &str = "IMAGE_DL_OUTPUT_DIR";
/// Environment variable overriding the per-request URL limit
pub const ENV_MAX_URLS: &str = "IMAGE_DL_MAX_URLS";
/// Environment variable overriding the per-fetch timeout (seconds)
pub const ENV_FETCH_TIMEOUT: &str = "IMAGE_DL_FETCH_TIMEOUT_SECS";

/// Main configuration
///
/// Immutable once the server starts; handlers read it through an `Arc`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Fetch and batch settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Scratch directory lifecycle
    #[serde(default)]
    pub scratch: ScratchConfig,
}

/// Image fetching behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Timeout for one fetch, covering connect and body transfer (default: 30 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// Maximum number of URLs accepted in one request (default: 10)
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// Reject images larger than this many bytes (None = unlimited)
    #[serde(default)]
    pub max_image_bytes: Option<u64>,

    /// User-Agent header sent with every fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Root directory for manifest-mode saves (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: default_fetch_timeout(),
            max_urls: default_max_urls(),
            max_image_bytes: None,
            user_agent: default_user_agent(),
            output_dir: default_output_dir(),
        }
    }
}

/// Request-scoped scratch directories and their sweeper
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Root under which each request gets its own directory (default: "./temp_downloads")
    #[serde(default = "default_scratch_root")]
    pub root: PathBuf,

    /// Run the stale-directory sweeper (default: true)
    #[serde(default = "default_true")]
    pub sweep_enabled: bool,

    /// How often the sweeper runs (default: 10 minutes)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,

    /// Age after which a leftover scratch directory is removed (default: 1 hour)
    #[serde(default = "default_stale_after", with = "duration_serde")]
    pub stale_after: Duration,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root: default_scratch_root(),
            sweep_enabled: true,
            sweep_interval: default_sweep_interval(),
            stale_after: default_stale_after(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment
    ///
    /// Unset variables keep their defaults. See [`Config::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// Recognized keys: `PORT`, `IMAGE_DL_SCRATCH_DIR`, `IMAGE_DL_OUTPUT_DIR`,
    /// `IMAGE_DL_MAX_URLS`, `IMAGE_DL_FETCH_TIMEOUT_SECS`. Empty values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(port) = get(ENV_PORT) {
            let port: u16 = parse_value(ENV_PORT, &port)?;
            config.api.bind_address.set_port(port);
        }
        if let Some(dir) = get(ENV_SCRATCH_DIR) {
            config.scratch.root = PathBuf::from(dir);
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            config.download.output_dir = PathBuf::from(dir);
        }
        if let Some(max) = get(ENV_MAX_URLS) {
            config.download.max_urls = parse_value(ENV_MAX_URLS, &max)?;
        }
        if let Some(secs) = get(ENV_FETCH_TIMEOUT) {
            config.download.fetch_timeout =
                Duration::from_secs(parse_value(ENV_FETCH_TIMEOUT, &secs)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.max_urls == 0 {
            return Err(Error::Config {
                message: "max_urls must be at least 1".into(),
                key: Some("max_urls".into()),
            });
        }
        if self.download.fetch_timeout.is_zero() {
            return Err(Error::Config {
                message: "fetch_timeout must be greater than zero".into(),
                key: Some("fetch_timeout".into()),
            });
        }
        if self.scratch.sweep_enabled && self.scratch.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "sweep_interval must be greater than zero".into(),
                key: Some("sweep_interval".into()),
            });
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| Error::Config {
        message: format!("invalid value {:?} for {}: {}", raw, key, e),
        key: Some(key.to_string()),
    })
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_urls() -> usize {
    10
}

fn default_user_agent() -> String {
    concat!("image-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_scratch_root() -> PathBuf {
    PathBuf::from("./temp_downloads")
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_stale_after() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
