//! Single-file transfer
//!
//! Each task runs strictly in order: admission check, open source, open
//! sink, bounded copy, finalize, record. Any failure ends the task; the
//! coordinator decides what that means for the batch.

use super::{TransferError, TransferState};
use crate::metrics;
use crate::store::{ObjectStore, ObjectWriter};
use crate::upload::reclaim;
use crate::worklist::WorkItem;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// How a task ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Uploaded { bytes: u64 },
    /// The batch was cancelled before this task did any I/O
    Skipped,
}

/// Upload one work item.
#[tracing::instrument(
    name = "upload.file",
    skip(store, state),
    fields(file = %item.relative, s3.key = %item.key),
    level = "debug"
)]
pub async fn upload_file(
    item: &WorkItem,
    store: &dyn ObjectStore,
    state: &TransferState,
) -> Result<TaskOutcome, TransferError> {
    if state.cancel.is_cancelled() {
        metrics::record_upload_skipped();
        return Ok(TaskOutcome::Skipped);
    }

    let started = Instant::now();

    let mut source = File::open(&item.local)
        .await
        .map_err(|source| TransferError::OpenSource {
            path: item.local.clone(),
            source,
        })?;

    let mut sink = store
        .open_writer(state.destination.bucket(), &item.key, &state.writer_options)
        .await
        .map_err(|source| TransferError::OpenSink {
            key: item.key.clone(),
            source,
        })?;

    let copied = {
        let mut buf = state.pool.acquire();
        copy_through(item, &mut source, sink.as_mut(), &mut buf).await
    };
    drop(source);

    let bytes = match copied {
        Ok(bytes) => bytes,
        Err(e) => {
            sink.abort().await;
            return Err(e);
        }
    };

    sink.finalize()
        .await
        .map_err(|source| TransferError::Finalize {
            key: item.key.clone(),
            source,
        })?;

    let elapsed = started.elapsed();
    let count = state.counter.record(bytes);
    metrics::record_upload_success(bytes, elapsed.as_secs_f64());

    if reclaim::is_due(count, state.config.reclaim_interval) {
        reclaim::reclaim(&state.pool);
    }

    if state.config.verbose {
        let url = state.destination.display_url(&item.key);
        tracing::info!(
            count,
            destination = %url,
            bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            "{:07}: -> {}: {:?}",
            count,
            url,
            elapsed
        );
    }

    Ok(TaskOutcome::Uploaded { bytes })
}

/// Stream `source` into `sink` through `buf`, returning bytes copied.
async fn copy_through(
    item: &WorkItem,
    source: &mut File,
    sink: &mut dyn ObjectWriter,
    buf: &mut [u8],
) -> Result<u64, TransferError> {
    let mut total = 0u64;
    loop {
        let n = source
            .read(buf)
            .await
            .map_err(|source| TransferError::Read {
                path: item.local.clone(),
                source,
            })?;
        if n == 0 {
            return Ok(total);
        }
        sink.write(&buf[..n])
            .await
            .map_err(|source| TransferError::Write {
                key: item.key.clone(),
                source,
            })?;
        total += n as u64;
    }
}
