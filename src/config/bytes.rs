//! Human-readable byte sizes (`512k`, `16MB`, `1g`)
//!
//! Suffixes are case-insensitive binary multiples. A bare number is bytes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Longest suffixes first so `mb` is not read as `b`.
const UNITS: &[(&str, u64)] = &[
    ("gb", GIB),
    ("mb", MIB),
    ("kb", KIB),
    ("g", GIB),
    ("m", MIB),
    ("k", KIB),
    ("b", 1),
];

/// Byte size parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ByteSizeError {
    #[error("empty byte size")]
    Empty,

    #[error("invalid byte size '{0}'")]
    Invalid(String),

    #[error("byte size '{0}' overflows u64")]
    Overflow(String),
}

/// A size in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const fn kib(n: u64) -> Self {
        Self(n * KIB)
    }

    pub const fn mib(n: u64) -> Self {
        Self(n * MIB)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Size as `usize`, saturating on 32-bit targets.
    pub fn as_usize(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl FromStr for ByteSize {
    type Err = ByteSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return Err(ByteSizeError::Empty);
        }

        let (digits, multiplier) = UNITS
            .iter()
            .find_map(|(suffix, value)| lowered.strip_suffix(suffix).map(|d| (d, *value)))
            .unwrap_or((lowered.as_str(), 1));

        let value: u64 = digits
            .trim()
            .parse()
            .map_err(|_| ByteSizeError::Invalid(s.to_string()))?;

        value
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| ByteSizeError::Overflow(s.to_string()))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (suffix, value) in [("g", GIB), ("m", MIB), ("k", KIB)] {
            if self.0 >= value && self.0 % value == 0 {
                return write!(f, "{}{}", self.0 / value, suffix);
            }
        }
        write!(f, "{}", self.0)
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(n) => Ok(ByteSize(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
