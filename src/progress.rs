//! Batch progress
//!
//! Shared completion counter and wall-clock timing for one upload batch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Count of successfully finalized uploads
#[derive(Debug, Default)]
pub struct UploadCounter {
    uploaded: AtomicU64,
    bytes: AtomicU64,
}

impl UploadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished upload, returning the new count.
    pub fn record(&self, bytes: u64) -> u64 {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        self.uploaded.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded.load(Ordering::Acquire)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Wall-clock timer started at the first submission
#[derive(Debug, Clone, Copy)]
pub struct BatchTimer {
    started: Instant,
}

impl BatchTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Outcome of a finished batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub uploaded: u64,
    pub bytes: u64,
    pub elapsed: Duration,
    /// Copy buffers allocated during the batch
    pub buffers_allocated: u64,
}

impl TransferSummary {
    /// Average throughput in bytes per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }
}
