//! Tracked pixel memory.
//!
//! Every pixel buffer the engine allocates is a [`TrackedBuf`]. Allocation and
//! drop update process-wide counters, read back through [`stats`].

use std::sync::atomic::{AtomicI64, Ordering};

use imgpipe_core::MemoryStats;

static MEMORY: AtomicI64 = AtomicI64::new(0);
static HIGHWATER: AtomicI64 = AtomicI64::new(0);
static ALLOCATIONS: AtomicI64 = AtomicI64::new(0);

/// Interleaved `f32` samples whose size is accounted for.
#[derive(Debug)]
pub struct TrackedBuf {
    data: Vec<f32>,
}

impl TrackedBuf {
    /// Takes ownership of `data` and records its size.
    pub fn new(data: Vec<f32>) -> Self {
        let bytes = byte_size(&data);
        let now = MEMORY.fetch_add(bytes, Ordering::Relaxed) + bytes;
        HIGHWATER.fetch_max(now, Ordering::Relaxed);
        ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        Self { data }
    }

    /// The samples.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Size in bytes.
    pub fn bytes(&self) -> u64 {
        byte_size(&self.data) as u64
    }
}

impl Drop for TrackedBuf {
    fn drop(&mut self) {
        MEMORY.fetch_sub(byte_size(&self.data), Ordering::Relaxed);
        ALLOCATIONS.fetch_sub(1, Ordering::Relaxed);
    }
}

fn byte_size(data: &[f32]) -> i64 {
    std::mem::size_of_val(data) as i64
}

/// Snapshot of tracked memory.
pub fn stats() -> MemoryStats {
    MemoryStats {
        memory: MEMORY.load(Ordering::Relaxed),
        memory_highwater: HIGHWATER.load(Ordering::Relaxed),
        allocations: ALLOCATIONS.load(Ordering::Relaxed),
    }
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
