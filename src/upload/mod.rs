//! Upload module
//!
//! Runs a work list through a fixed number of concurrent upload tasks.
//!
//! # Failure policy
//!
//! The first task that fails cancels the batch: tasks that have not started
//! yet exit without doing I/O, tasks already copying run to completion, and
//! the batch reports that first error only.
//!
//! # Example
//!
//! ```no_run
//! use bulk_uploadr::config::TransferConfig;
//! use bulk_uploadr::destination::Destination;
//! use bulk_uploadr::store::MemoryObjectStore;
//! use bulk_uploadr::upload::Uploader;
//! use bulk_uploadr::worklist::WorkList;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryObjectStore::new());
//! let destination = Destination::parse("mem://bucket/prefix", "mem")?;
//! let work = WorkList::from_directory("./data")?;
//!
//! let uploader = Uploader::new(store, destination, TransferConfig::default());
//! let summary = uploader.run(&work).await?;
//! println!("uploaded {} files", summary.uploaded);
//! # Ok(())
//! # }
//! ```

use crate::buffer::BufferPool;
use crate::config::TransferConfig;
use crate::destination::Destination;
use crate::metrics;
use crate::progress::{BatchTimer, TransferSummary, UploadCounter};
use crate::store::{ObjectStore, StoreError, WriterOptions};
use crate::worklist::{EnumerationError, WorkList};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub mod reclaim;
pub mod task;

pub use task::TaskOutcome;

/// Upload errors
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("open upload file {path}: {source}")]
    OpenSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("open writer for {key}: {source}")]
    OpenSink {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("close writer for {key}: {source}")]
    Finalize {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("destination scheme {destination}:// does not match {store}:// store")]
    SchemeMismatch { store: String, destination: String },

    #[error("enumerate: {0}")]
    Enumeration(#[from] EnumerationError),

    #[error("upload task failed: {0}")]
    Task(String),
}

impl TransferError {
    /// Short name of the stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            TransferError::OpenSource { .. } => "open",
            TransferError::OpenSink { .. } => "open_writer",
            TransferError::Read { .. } => "read",
            TransferError::Write { .. } => "write",
            TransferError::Finalize { .. } => "close",
            TransferError::SchemeMismatch { .. } => "config",
            TransferError::Enumeration(_) => "walk",
            TransferError::Task(_) => "task",
        }
    }
}

/// State shared by every task of one batch
#[derive(Debug)]
pub struct TransferState {
    pub destination: Destination,
    pub config: TransferConfig,
    pub writer_options: WriterOptions,
    pub pool: BufferPool,
    pub counter: UploadCounter,
    pub cancel: CancellationToken,
    first_error: Mutex<Option<TransferError>>,
}

impl TransferState {
    pub fn new(destination: Destination, config: TransferConfig) -> Self {
        let writer_options = WriterOptions {
            chunk_size: config.chunk_size.as_usize(),
            retry: config.retry.clone(),
        };
        Self {
            pool: BufferPool::new(config.buffer_size.as_usize()),
            destination,
            writer_options,
            config,
            counter: UploadCounter::new(),
            cancel: CancellationToken::new(),
            first_error: Mutex::new(None),
        }
    }

    /// Record a fatal task error and cancel the batch.
    ///
    /// Only the first error is kept.
    pub fn fail(&self, error: TransferError) {
        metrics::record_upload_failure(error.stage());
        {
            let mut slot = self.first_error.lock();
            if slot.is_none() {
                tracing::debug!(stage = error.stage(), error = %error, "Cancelling batch");
                *slot = Some(error);
            } else {
                tracing::debug!(stage = error.stage(), error = %error, "Discarding secondary error");
            }
        }
        self.cancel.cancel();
    }

    fn take_error(&self) -> Option<TransferError> {
        self.first_error.lock().take()
    }
}

/// Bounded-concurrency batch uploader
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    destination: Destination,
    config: TransferConfig,
}

impl Uploader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        destination: Destination,
        config: TransferConfig,
    ) -> Self {
        Self {
            store,
            destination,
            config,
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Upload every item of `work`.
    ///
    /// Returns once all submitted tasks have finished. Submission blocks
    /// while `concurrency` tasks are in flight and stops at the first
    /// failure.
    #[tracing::instrument(
        name = "upload.batch",
        skip(self, work),
        fields(
            destination = %self.destination,
            files = work.len(),
            concurrency = self.config.concurrency
        )
    )]
    pub async fn run(&self, work: &WorkList) -> Result<TransferSummary, TransferError> {
        if self.store.scheme() != self.destination.scheme() {
            return Err(TransferError::SchemeMismatch {
                store: self.store.scheme().to_string(),
                destination: self.destination.scheme().to_string(),
            });
        }

        let state = Arc::new(TransferState::new(
            self.destination.clone(),
            self.config.clone(),
        ));
        let limiter = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks: JoinSet<()> = JoinSet::new();
        let timer = BatchTimer::start();

        for item in work.items(&self.destination) {
            let permit = tokio::select! {
                biased;
                _ = state.cancel.cancelled() => break,
                permit = Arc::clone(&limiter).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let store = Arc::clone(&self.store);
            let task_state = Arc::clone(&state);
            tasks.spawn(async move {
                match task::upload_file(&item, store.as_ref(), &task_state).await {
                    Ok(TaskOutcome::Skipped) => {
                        tracing::debug!(file = %item.relative, "Skipped after cancellation");
                    }
                    Ok(TaskOutcome::Uploaded { .. }) => {}
                    Err(e) => task_state.fail(e),
                }
                drop(permit);
            }
            .instrument(tracing::Span::current()));

            while let Some(joined) = tasks.try_join_next() {
                absorb(joined, &state);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            absorb(joined, &state);
        }

        let summary = TransferSummary {
            uploaded: state.counter.uploaded(),
            bytes: state.counter.bytes(),
            elapsed: timer.elapsed(),
            buffers_allocated: state.pool.stats().allocated,
        };

        tracing::info!(
            uploaded = summary.uploaded,
            bytes = summary.bytes,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "total: {:?}",
            summary.elapsed
        );

        match state.take_error() {
            Some(error) => Err(error),
            None => Ok(summary),
        }
    }
}

fn absorb(joined: Result<(), JoinError>, state: &TransferState) {
    if let Err(e) = joined {
        state.fail(TransferError::Task(e.to_string()));
    }
}
