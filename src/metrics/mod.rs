//! Metrics module
//!
//! Provides Prometheus metrics for upload batches.

pub mod textfile;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Histogram,
};

pub use textfile::write_textfile;

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "bulk_uploads_total",
        "Total number of file uploads",
        &["status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "bulk_upload_bytes_total",
        "Total bytes uploaded"
    ).unwrap();

    pub static ref UPLOAD_DURATION: Histogram = register_histogram!(
        "bulk_upload_duration_seconds",
        "Per-file upload duration in seconds",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 60.0]
    ).unwrap();

    // Resource metrics
    pub static ref BUFFER_ALLOCATIONS: Counter = register_counter!(
        "bulk_buffer_allocations_total",
        "Copy buffers allocated by the buffer pool"
    ).unwrap();

    pub static ref RECLAIM_PASSES: Counter = register_counter!(
        "bulk_reclaim_passes_total",
        "Explicit memory reclamation passes"
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "bulk_errors_total",
        "Total errors by failing stage",
        &["stage"]
    ).unwrap();
}

/// Record a successful upload
pub fn record_upload_success(bytes: u64, duration_secs: f64) {
    UPLOADS_TOTAL.with_label_values(&["success"]).inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
    UPLOAD_DURATION.observe(duration_secs);
}

/// Record a failed upload
pub fn record_upload_failure(stage: &str) {
    UPLOADS_TOTAL.with_label_values(&["failure"]).inc();
    ERRORS_TOTAL.with_label_values(&[stage]).inc();
}

/// Record an upload skipped because the batch was cancelled
pub fn record_upload_skipped() {
    UPLOADS_TOTAL.with_label_values(&["skipped"]).inc();
}

pub fn record_buffer_allocation() {
    BUFFER_ALLOCATIONS.inc();
}

pub fn record_reclaim_pass() {
    RECLAIM_PASSES.inc();
}
