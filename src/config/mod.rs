//! Configuration module for the upload gateway
//!
//! Configuration comes either from environment variables (the default for
//! container deployments) or from a YAML file with environment variable
//! expansion. Both paths end in [`Config::validate`].

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Environment variable names read by [`Config::from_env`]
pub mod env {
    pub const REGION: &str = "AWS_S3_REGION";
    pub const ACCESS_KEY_ID: &str = "AWS_S3_ACCESS_KEY_ID";
    pub const SECRET_ACCESS_KEY: &str = "AWS_S3_SECRET_ACCESS_KEY";
    pub const BUCKET_NAME: &str = "AWS_S3_BUCKET_NAME";
    pub const ENDPOINT: &str = "AWS_S3_ENDPOINT";
    pub const SERVER_ADDRESS: &str = "SERVER_ADDRESS";
    pub const KEY_PREFIX: &str = "UPLOAD_KEY_PREFIX";
    pub const MAX_CONCURRENCY: &str = "UPLOAD_MAX_CONCURRENCY";
    pub const METRICS_ENABLED: &str = "METRICS_ENABLED";
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigLoader::from_env()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.address.parse::<SocketAddr>().map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid server address '{}': {}",
                self.server.address, e
            ))
        })?;

        if self.server.max_memory_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_memory_bytes must be greater than zero".into(),
            ));
        }

        if self.upload.max_concurrent_uploads == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_concurrent_uploads must be at least 1".into(),
            ));
        }

        // Credentials are not checked: an empty value surfaces on the
        // first store call.
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    /// Per-file threshold above which multipart parts spill to a temp file
    #[serde(default = "default_max_memory_bytes")]
    pub max_memory_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            max_memory_bytes: default_max_memory_bytes(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_memory_bytes() -> usize {
    33554432 // 32MB
}

/// Object store configuration
///
/// Immutable once the gateway is built from it.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Custom endpoint for S3-compatible stores (MinIO, RustFS).
    /// Only affects where requests go, never the synthesized public URL.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("bucket_name", &self.bucket_name)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Upload behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Prefix prepended verbatim to every uploaded filename
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Upper bound on concurrent store uploads within one batch
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            max_concurrent_uploads: default_max_concurrent_uploads(),
        }
    }
}

fn default_key_prefix() -> String {
    "uploads/".to_string()
}

fn default_max_concurrent_uploads() -> usize {
    8
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}
