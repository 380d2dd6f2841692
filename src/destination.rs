//! Destination URI parsing
//!
//! Maps `scheme://bucket/prefix` onto a bucket and a key prefix, and turns
//! relative file paths into object keys under that prefix.

use std::fmt;
use thiserror::Error;

/// Destination errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DestinationError {
    #[error("Invalid destination '{0}': expected scheme://bucket/prefix")]
    InvalidUri(String),

    #[error("Destination must start with {expected}://, got {actual}://")]
    SchemeMismatch { expected: String, actual: String },

    #[error("Destination '{0}' is missing a bucket")]
    MissingBucket(String),
}

/// Remote location files are uploaded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    scheme: String,
    bucket: String,
    prefix: String,
}

impl Destination {
    /// Parse a destination URI, requiring `expected_scheme`.
    pub fn parse(uri: &str, expected_scheme: &str) -> Result<Self, DestinationError> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| DestinationError::InvalidUri(uri.to_string()))?;

        if scheme.is_empty() {
            return Err(DestinationError::InvalidUri(uri.to_string()));
        }

        if !scheme.eq_ignore_ascii_case(expected_scheme) {
            return Err(DestinationError::SchemeMismatch {
                expected: expected_scheme.to_string(),
                actual: scheme.to_string(),
            });
        }

        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(DestinationError::MissingBucket(uri.to_string()));
        }

        Ok(Self {
            scheme: expected_scheme.to_string(),
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key prefix without leading or trailing `/`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Object key for a slash-normalized relative path.
    pub fn object_key(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if self.prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.prefix, relative)
        }
    }

    /// Fully-qualified URL of an object key
    pub fn display_url(&self, key: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, key)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.prefix)
    }
}
