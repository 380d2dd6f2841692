//! Configuration module for Bulk Uploadr
//!
//! Settings come from an optional YAML file (with environment variable
//! expansion) and are then overridden by command-line flags.

use crate::store::s3::MAX_PART_SIZE;
use crate::store::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod bytes;
mod loader;

pub use bytes::{ByteSize, ByteSizeError};
pub use loader::ConfigLoader;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub s3: S3Config,
    #[serde(default)]
    pub transfer: TransferConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.s3.validate()?;
        self.transfer.validate()
    }
}

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// S3 connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    #[serde(default)]
    pub force_path_style: bool,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: None,
            force_path_style: false,
            access_key: None,
            secret_key: None,
            session_token: None,
        }
    }
}

impl S3Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "s3.region cannot be empty".into(),
            ));
        }

        if let Some(ref endpoint) = self.endpoint {
            if !is_valid_http_url(endpoint) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid s3.endpoint '{}': must start with http:// or https://",
                    endpoint
                )));
            }
        }

        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(ConfigError::ValidationError(
                "s3.access_key and s3.secret_key must be set together".into(),
            ));
        }

        Ok(())
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Transfer tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Maximum in-flight uploads
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Copy buffer between local reads and remote writes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: ByteSize,
    /// Bytes per remote request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: ByteSize,
    /// Run a reclamation pass every N uploads; 0 disables
    #[serde(default)]
    pub reclaim_interval: u64,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            buffer_size: default_buffer_size(),
            chunk_size: default_chunk_size(),
            reclaim_interval: 0,
            shuffle: false,
            verbose: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl TransferConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.buffer_size.as_u64() == 0 {
            return Err(ConfigError::ValidationError(
                "buffer size must be greater than zero".into(),
            ));
        }
        if self.chunk_size.as_u64() == 0 {
            return Err(ConfigError::ValidationError(
                "chunk size must be greater than zero".into(),
            ));
        }
        if self.chunk_size.as_u64() > MAX_PART_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "chunk size {} exceeds the 5g part size limit",
                self.chunk_size
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_concurrency() -> usize {
    24
}

fn default_buffer_size() -> ByteSize {
    ByteSize::kib(512)
}

fn default_chunk_size() -> ByteSize {
    ByteSize::mib(16)
}
