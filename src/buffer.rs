//! Reusable copy buffers
//!
//! Every in-flight upload borrows one fixed-size buffer for its streamed
//! copy. Returning buffers to the pool bounds peak memory by the number of
//! concurrent uploads instead of the number of files.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A pool of same-sized byte buffers
///
/// [`BufferPool::acquire`] never waits: it hands out an idle buffer or
/// allocates a fresh one. Buffers are not zeroed between uses.
#[derive(Debug)]
pub struct BufferPool {
    buffer_size: usize,
    idle: Mutex<Vec<Vec<u8>>>,
    allocated: AtomicU64,
    recycled: AtomicU64,
    checked_out: AtomicUsize,
    peak_checked_out: AtomicUsize,
}

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Buffers ever allocated
    pub allocated: u64,
    /// Acquisitions served from the idle set
    pub recycled: u64,
    pub checked_out: usize,
    pub peak_checked_out: usize,
    pub idle: usize,
}

impl BufferPool {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
            idle: Mutex::new(Vec::new()),
            allocated: AtomicU64::new(0),
            recycled: AtomicU64::new(0),
            checked_out: AtomicUsize::new(0),
            peak_checked_out: AtomicUsize::new(0),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Check out a buffer. It returns to the pool when dropped.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let recycled = self.idle.lock().pop();
        let buf = match recycled {
            Some(buf) => {
                self.recycled.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_buffer_allocation();
                vec![0u8; self.buffer_size]
            }
        };

        let now = self.checked_out.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_checked_out.fetch_max(now, Ordering::AcqRel);

        PooledBuffer { pool: self, buf }
    }

    fn release(&self, buf: Vec<u8>) {
        self.checked_out.fetch_sub(1, Ordering::AcqRel);
        self.idle.lock().push(buf);
    }

    /// Drop every idle buffer. Returns how many were freed.
    pub fn shrink(&self) -> usize {
        let drained = std::mem::take(&mut *self.idle.lock());
        drained.len()
    }

    pub fn stats(&self) -> BufferPoolStats {
        BufferPoolStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            checked_out: self.checked_out.load(Ordering::Acquire),
            peak_checked_out: self.peak_checked_out.load(Ordering::Acquire),
            idle: self.idle.lock().len(),
        }
    }
}

/// A buffer checked out of a [`BufferPool`]
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
