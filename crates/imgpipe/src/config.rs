//! Engine configuration.
//!
//! Limits applied at initialization. The environment is read once, by
//! [`EngineConfig::from_env`]; later changes to it have no effect on a
//! running engine.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `IMGPIPE_CONCURRENCY` | Worker thread count (positive integer) |
//! | `IMGPIPE_TRACE` | Any non-empty value turns on cache tracing |

use std::env;

use imgpipe_engine::{DEFAULT_MAX_MEM, DEFAULT_MAX_OPS};

/// Worker thread count override.
pub const ENV_CONCURRENCY: &str = "IMGPIPE_CONCURRENCY";
/// Cache trace toggle.
pub const ENV_TRACE: &str = "IMGPIPE_TRACE";

/// Settings applied when the engine starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Operation cache memory ceiling in bytes.
    pub max_cache_mem: u64,
    /// Operation cache entry ceiling.
    pub max_cache_ops: usize,
    /// Engine worker threads.
    pub concurrency: usize,
    /// Log cache hits, misses and evictions.
    pub cache_trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cache_mem: DEFAULT_MAX_MEM,
            max_cache_ops: DEFAULT_MAX_OPS,
            concurrency: 1,
            cache_trace: false,
        }
    }
}

impl EngineConfig {
    /// Defaults with the environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let concurrency = lookup(ENV_CONCURRENCY)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.concurrency);
        let cache_trace = lookup(ENV_TRACE).is_some_and(|v| !v.is_empty());
        Self { concurrency, cache_trace, ..defaults }
    }

    /// Sets the worker thread count.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets both cache ceilings.
    pub fn with_cache_limits(mut self, max_mem: u64, max_ops: usize) -> Self {
        self.max_cache_mem = max_mem;
        self.max_cache_ops = max_ops;
        self
    }

    /// Turns cache tracing on or off.
    pub fn with_cache_trace(mut self, trace: bool) -> Self {
        self.cache_trace = trace;
        self
    }
}
