//! Object store module
//!
//! The uploader treats the remote store as an opaque sink: open a write
//! stream for `(bucket, key)`, push bytes into it, then finalize. Transport
//! retries, request batching and authentication belong to the implementation.
//!
//! # Implementations
//!
//! - [`S3ObjectStore`] - Amazon S3 and S3-compatible endpoints (`s3://`)
//! - [`MemoryObjectStore`] - In-process store for tests and benchmarks (`mem://`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod credentials;
pub mod memory;
pub mod s3;

pub use memory::MemoryObjectStore;
pub use s3::{S3ObjectStore, S3StoreConfig};

/// Object store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{operation} failed for {key}: {message}")]
    Request {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("Object {key} exceeds {max_parts} parts at chunk size {chunk_size}")]
    PartLimit {
        key: String,
        max_parts: usize,
        chunk_size: usize,
    },
}

/// How the store should react to transient transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    /// Exponential backoff with jitter
    Standard,
    /// Standard retries plus client-side rate limiting
    Adaptive,
    /// Surface the first failure
    Disabled,
}

/// Retry policy handed to every write stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_retry_mode")]
    pub mode: RetryMode,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            mode: RetryMode::Disabled,
            max_attempts: 1,
            initial_backoff_ms: 0,
        }
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            mode: default_retry_mode(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

fn default_retry_mode() -> RetryMode {
    RetryMode::Standard
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

/// Options for a single write stream
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Bytes batched into one network request
    pub chunk_size: usize,
    pub retry: RetryPolicy,
}

/// A remote object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// URI scheme served by this store, e.g. `s3`
    fn scheme(&self) -> &str;

    /// Open a write stream for `bucket`/`key`.
    async fn open_writer(
        &self,
        bucket: &str,
        key: &str,
        options: &WriterOptions,
    ) -> Result<Box<dyn ObjectWriter>, StoreError>;
}

/// A streaming write into one remote object
///
/// Nothing is durable until [`ObjectWriter::finalize`] returns `Ok`.
#[async_trait]
pub trait ObjectWriter: Send {
    /// Append bytes to the object.
    async fn write(&mut self, data: &[u8]) -> Result<(), StoreError>;

    /// Commit the object.
    async fn finalize(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard anything written so far. Best effort.
    async fn abort(self: Box<Self>) {}
}
