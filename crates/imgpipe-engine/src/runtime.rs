//! Process-wide engine state.
//!
//! The engine owns one worker pool sized by the concurrency setting, the
//! operation cache, and the tracked-memory counters. [`init`] and
//! [`shutdown`] are idempotent; callers serialize them.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use rayon::ThreadPool;
use tracing::{debug, info};

use crate::cache;
use crate::error::{error, thread_shutdown, Status};
use crate::image::live_images;
use crate::memory::{self, format_bytes};

/// Engine version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static POOL: RwLock<Option<Arc<ThreadPool>>> = RwLock::new(None);
static CONCURRENCY: AtomicUsize = AtomicUsize::new(1);

/// Engine version as (major, minor, micro).
pub fn version() -> (u32, u32, u32) {
    let mut parts = VERSION.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

/// Starts the engine. A no-op when already running.
pub fn init(name: &str) -> Status<()> {
    let mut pool = POOL.write().unwrap_or_else(|e| e.into_inner());
    if pool.is_some() {
        return Ok(());
    }
    let threads = concurrency_get();
    *pool = Some(build_pool(threads)?);
    info!(name, version = VERSION, threads, "engine started");
    Ok(())
}

/// Stops the engine: drops the worker pool and the operation cache, and
/// releases the calling thread's engine state. A no-op when not running.
pub fn shutdown() {
    let mut pool = POOL.write().unwrap_or_else(|e| e.into_inner());
    if pool.take().is_none() {
        return;
    }
    cache::with(|c| c.clear());
    thread_shutdown();
    info!("engine stopped");
}

/// Returns true between [`init`] and [`shutdown`].
pub fn is_initialized() -> bool {
    POOL.read().unwrap_or_else(|e| e.into_inner()).is_some()
}

/// The worker pool, if the engine is running.
pub(crate) fn pool() -> Option<Arc<ThreadPool>> {
    POOL.read().unwrap_or_else(|e| e.into_inner()).clone()
}

fn build_pool(threads: usize) -> Status<Arc<ThreadPool>> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("imgpipe-worker-{i}"))
        .build()
        .map(Arc::new)
        .map_err(|e| error("init", &e.to_string()))
}

/// Sets the worker count, minimum 1. Rebuilds the pool when running.
pub fn concurrency_set(threads: usize) -> Status<()> {
    let threads = threads.max(1);
    CONCURRENCY.store(threads, Ordering::Relaxed);
    let mut pool = POOL.write().unwrap_or_else(|e| e.into_inner());
    if let Some(current) = pool.as_ref() {
        if current.current_num_threads() != threads {
            *pool = Some(build_pool(threads)?);
            debug!(threads, "worker pool resized");
        }
    }
    Ok(())
}

/// Current worker count.
pub fn concurrency_get() -> usize {
    CONCURRENCY.load(Ordering::Relaxed)
}

/// Sets the operation cache memory ceiling.
pub fn cache_set_max_mem(bytes: u64) {
    cache::with(|c| c.set_max_bytes(bytes));
}

/// Sets the operation cache entry ceiling. Zero disables caching.
pub fn cache_set_max(ops: usize) {
    cache::with(|c| c.set_max_ops(ops));
}

/// Turns cache event logging on or off.
pub fn cache_set_trace(trace: bool) {
    cache::with(|c| c.set_trace(trace));
}

/// Empties the operation cache.
pub fn cache_drop_all() {
    cache::with(|c| c.clear());
}

/// Number of cached operations.
pub fn cache_size() -> usize {
    cache::with(|c| c.len())
}

/// Bytes held by cached outputs.
pub fn cache_bytes() -> u64 {
    cache::with(|c| c.size_bytes())
}

/// Writes a summary of engine state.
pub fn print_all<W: Write>(out: &mut W) -> io::Result<()> {
    let stats = memory::stats();
    let (entries, bytes, max_bytes, max_ops, hits, misses, trace) = cache::with(|c| {
        (c.len(), c.size_bytes(), c.max_bytes(), c.max_ops(), c.hits(), c.misses(), c.trace())
    });
    writeln!(out, "imgpipe-engine {VERSION}")?;
    writeln!(out, "  initialized: {}", is_initialized())?;
    writeln!(out, "  concurrency: {}", concurrency_get())?;
    writeln!(out, "  live images: {}", live_images())?;
    writeln!(
        out,
        "  memory:      {} in {} allocations, high-water {}",
        format_bytes(stats.memory.max(0) as u64),
        stats.allocations,
        format_bytes(stats.memory_highwater.max(0) as u64)
    )?;
    writeln!(
        out,
        "  cache:       {entries}/{max_ops} ops, {} of {}, {hits} hits, {misses} misses, trace {}",
        format_bytes(bytes),
        format_bytes(max_bytes),
        if trace { "on" } else { "off" }
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses() {
        let (major, minor, _) = version();
        assert_eq!(format!("{major}.{minor}"), VERSION.rsplitn(2, '.').last().unwrap_or(""));
    }

    #[test]
    fn print_all_writes_summary() {
        let mut out = Vec::new();
        print_all(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("live images"));
        assert!(text.contains("cache:"));
    }
}
