//! Tracing subscriber setup
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, else --log-level)
//!   └── Fmt Layer (stderr, text or JSON)
//! ```
//!
//! Logs go to stderr so stdout stays free for piping.

use clap::ValueEnum;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Logging setup errors
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Failed to set global subscriber (may already be initialized): {0}")]
    AlreadyInitialized(String),
}

/// Console log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Build the level filter.
///
/// `RUST_LOG` wins when set and valid; otherwise `level` is used.
pub fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
        filter: level.to_string(),
        message: e.to_string(),
    })
}

/// Install the global subscriber
pub fn init(level: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = env_filter(level)?;

    let result = match format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false);
            tracing::subscriber::set_global_default(
                tracing_subscriber::registry().with(filter).with(fmt_layer),
            )
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true);
            tracing::subscriber::set_global_default(
                tracing_subscriber::registry().with(filter).with(fmt_layer),
            )
        }
    };

    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
