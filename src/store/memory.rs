//! In-memory object store
//!
//! Keeps committed objects in a map and tracks how many write streams are
//! open at once. Failures can be injected per key at open, write or
//! finalize, and writes can be slowed down to make overlap observable.
//!
//! # Example
//!
//! ```
//! use bulk_uploadr::store::{MemoryObjectStore, ObjectStore, RetryPolicy, WriterOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryObjectStore::new();
//! let options = WriterOptions { chunk_size: 1024, retry: RetryPolicy::default() };
//!
//! let mut writer = store.open_writer("bucket", "hello.txt", &options).await?;
//! writer.write(b"Hello, World!").await?;
//! writer.finalize().await?;
//!
//! assert_eq!(store.object("bucket", "hello.txt").as_deref(), Some(&b"Hello, World!"[..]));
//! # Ok(())
//! # }
//! ```

use super::{ObjectStore, ObjectWriter, StoreError, WriterOptions};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Stage at which an injected failure fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailAt {
    Open,
    Write,
    Finalize,
}

#[derive(Debug, Default)]
struct Inner {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    failures: Mutex<HashSet<(String, FailAt)>>,
    opened: Mutex<Vec<String>>,
    open_writers: AtomicUsize,
    peak_open_writers: AtomicUsize,
    write_delay: Mutex<Option<Duration>>,
}

/// Object store backed by process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<Inner>,
}

impl MemoryObjectStore {
    pub const SCHEME: &'static str = "mem";

    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every write call
    pub fn with_write_delay(self, delay: Duration) -> Self {
        *self.inner.write_delay.lock() = Some(delay);
        self
    }

    /// Make the given key fail at `stage`
    pub fn fail_on(&self, key: &str, stage: FailAt) {
        self.inner.failures.lock().insert((key.to_string(), stage));
    }

    /// Committed contents of an object
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.inner
            .objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Sorted keys of all committed objects in `bucket`
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .objects
            .lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn object_count(&self) -> usize {
        self.inner.objects.lock().len()
    }

    /// Keys for which a write stream was requested, in request order
    pub fn opened_keys(&self) -> Vec<String> {
        self.inner.opened.lock().clone()
    }

    pub fn open_writers(&self) -> usize {
        self.inner.open_writers.load(Ordering::Acquire)
    }

    /// Most write streams ever open at the same time
    pub fn peak_open_writers(&self) -> usize {
        self.inner.peak_open_writers.load(Ordering::Acquire)
    }

    fn should_fail(&self, key: &str, stage: FailAt) -> bool {
        self.inner
            .failures
            .lock()
            .contains(&(key.to_string(), stage))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    async fn open_writer(
        &self,
        bucket: &str,
        key: &str,
        _options: &WriterOptions,
    ) -> Result<Box<dyn ObjectWriter>, StoreError> {
        self.inner.opened.lock().push(key.to_string());

        if self.should_fail(key, FailAt::Open) {
            return Err(StoreError::Request {
                operation: "OpenWriter",
                key: key.to_string(),
                message: "injected failure".into(),
            });
        }

        let now = self.inner.open_writers.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.peak_open_writers.fetch_max(now, Ordering::AcqRel);

        Ok(Box::new(MemoryWriter {
            store: self.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            data: Vec::new(),
        }))
    }
}

/// Write stream into a [`MemoryObjectStore`]
struct MemoryWriter {
    store: MemoryObjectStore,
    bucket: String,
    key: String,
    data: Vec<u8>,
}

#[async_trait]
impl ObjectWriter for MemoryWriter {
    async fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        let delay = *self.store.inner.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.store.should_fail(&self.key, FailAt::Write) {
            return Err(StoreError::Request {
                operation: "Write",
                key: self.key.clone(),
                message: "injected failure".into(),
            });
        }
        self.data.extend_from_slice(data);
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<(), StoreError> {
        if self.store.should_fail(&self.key, FailAt::Finalize) {
            return Err(StoreError::Request {
                operation: "Finalize",
                key: self.key.clone(),
                message: "injected failure".into(),
            });
        }
        let mut this = *self;
        let data = std::mem::take(&mut this.data);
        this.store
            .inner
            .objects
            .lock()
            .insert((this.bucket.clone(), this.key.clone()), data);
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.store.inner.open_writers.fetch_sub(1, Ordering::AcqRel);
    }
}
