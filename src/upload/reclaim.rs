//! Periodic memory reclamation
//!
//! Sustained transfers of many large files churn through allocations faster
//! than the allocator hands memory back. A reclamation pass frees the idle
//! copy buffers and asks the allocator to return free heap pages to the OS.
//! It never fails and never touches buffers that are checked out.

use crate::buffer::BufferPool;
use crate::metrics;

/// Whether upload number `count` should trigger a pass.
pub fn is_due(count: u64, interval: u64) -> bool {
    interval > 0 && count > 0 && count % interval == 0
}

/// Run one reclamation pass, returning the number of buffers freed.
pub fn reclaim(pool: &BufferPool) -> usize {
    let freed = pool.shrink();
    let trimmed = trim_heap();
    metrics::record_reclaim_pass();
    tracing::debug!(freed_buffers = freed, heap_trimmed = trimmed, "Reclamation pass");
    freed
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn trim_heap() -> bool {
    // SAFETY: malloc_trim only releases free memory held by glibc's allocator.
    unsafe { libc::malloc_trim(0) != 0 }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn trim_heap() -> bool {
    false
}
