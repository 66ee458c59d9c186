//! # Configuration Management
//!
//! Server configuration is a single [`Config`] value built once at startup and
//! handed to [`crate::state::AppState`]. Sections:
//!
//! - [`ServerConfig`]: bind address and CORS origins
//! - [`StorageConfig`]: object store backend, bucket and key prefix
//! - [`LimitsConfig`]: request body and package content limits
//! - [`DebloatConfig`]: whether submitted content may be minified
//!
//! ## Loading Configuration
//!
//! ```rust,no_run
//! use registry_server::config::Config;
//!
//! // Load from file with fallback to the embedded defaults
//! let mut config = Config::load_or_default("config.json")?;
//!
//! // REGISTRY_* and AWS_REGION environment variables win over the file
//! config.apply_env_overrides();
//! config.validate()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Credentials never live in the configuration file; see
//! [`crate::storage::S3Credentials`].

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while loading or checking configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main configuration structure for the registry server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Request and content limits (defaults applied if not specified)
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub debloat: DebloatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host/IP address to bind to (e.g., "0.0.0.0" or "localhost")
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS; `"*"` allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,
}

/// Which [`crate::storage::ObjectStore`] implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid(format!(
                "unknown storage backend '{}' (expected s3, local or memory)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom S3-compatible endpoint, e.g. `http://localhost:9000` for MinIO
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Namespace every package object is stored under
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Root directory for the local backend
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackend::default(),
            bucket: "package-registry".to_string(),
            region: default_region(),
            endpoint: None,
            key_prefix: default_key_prefix(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_request_body_size_mb: usize,
    /// Limit on the decoded `Content` payload
    pub max_content_size_mb: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_request_body_size_mb: 150,
            max_content_size_mb: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebloatConfig {
    pub enabled: bool,
}

impl Default for DebloatConfig {
    fn default() -> Self {
        DebloatConfig { enabled: true }
    }
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_key_prefix() -> String {
    "packages".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not match the configuration
    /// format.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&config_str).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from file, or the embedded defaults when the file
    /// doesn't exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `REGISTRY_*` and `AWS_REGION` overrides from the process
    /// environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = get("REGISTRY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("REGISTRY_PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid REGISTRY_PORT"),
            }
        }
        if let Some(backend) = get("REGISTRY_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(backend) => self.storage.backend = backend,
                Err(e) => tracing::warn!(error = %e, "Ignoring REGISTRY_STORAGE_BACKEND"),
            }
        }
        if let Some(bucket) = get("REGISTRY_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(region) = get("AWS_REGION") {
            self.storage.region = region;
        }
        if let Some(endpoint) = get("REGISTRY_S3_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(prefix) = get("REGISTRY_KEY_PREFIX") {
            self.storage.key_prefix = prefix;
        }
        if let Some(dir) = get("REGISTRY_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".to_string()));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.bucket is required for the s3 backend".to_string(),
            ));
        }
        if self.storage.key_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid(
                "storage.key_prefix must not be empty".to_string(),
            ));
        }
        if self.limits.max_content_size_mb == 0 || self.limits.max_request_body_size_mb == 0 {
            return Err(ConfigError::Invalid("limits must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Get the maximum request body size in bytes.
    pub fn max_request_body_size_bytes(&self) -> usize {
        self.limits.max_request_body_size_mb * 1024 * 1024
    }

    /// Get the maximum decoded content size in bytes.
    pub fn max_content_size_bytes(&self) -> u64 {
        self.limits.max_content_size_mb as u64 * 1024 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        serde_json::from_str(include_str!("../config.json"))
            .expect("Failed to parse embedded config.json")
    }
}
