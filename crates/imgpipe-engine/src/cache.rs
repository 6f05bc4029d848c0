//! LRU operation cache.
//!
//! Operations are pure functions of their input nodes and parameters, so an
//! output node can be reused when the same operation runs again on the same
//! inputs. Entries are bounded by total pixel bytes and by entry count, and
//! the least recently used entry goes first.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, OnceLock};

use tracing::debug;

use crate::image::VImage;
use crate::memory::format_bytes;

/// Default memory ceiling for cached outputs.
pub const DEFAULT_MAX_MEM: u64 = 100 * 1024 * 1024;

/// Default ceiling on cached operations.
pub const DEFAULT_MAX_OPS: usize = 500;

/// Identity of one operation call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpKey {
    /// Operation name.
    pub op: &'static str,
    /// Input node ids, in argument order.
    pub inputs: Vec<u64>,
    /// Fingerprint of the non-image parameters.
    pub params: u64,
}

struct Entry {
    image: VImage,
    size_bytes: u64,
}

/// Operation cache keyed on [`OpKey`].
pub struct OpCache {
    entries: HashMap<OpKey, Entry>,
    /// Front = oldest.
    access_order: VecDeque<OpKey>,
    total_bytes: u64,
    max_bytes: u64,
    max_ops: usize,
    trace: bool,
    hits: u64,
    misses: u64,
}

impl OpCache {
    /// Creates a cache with the default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_MEM, DEFAULT_MAX_OPS)
    }

    /// Creates a cache with explicit limits.
    pub fn with_limits(max_bytes: u64, max_ops: usize) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: VecDeque::new(),
            total_bytes: 0,
            max_bytes,
            max_ops,
            trace: false,
            hits: 0,
            misses: 0,
        }
    }

    /// Returns a new reference to the cached output, if any.
    pub fn get(&mut self, key: &OpKey) -> Option<VImage> {
        match self.entries.get(key) {
            Some(entry) => {
                let image = entry.image.clone();
                self.hits += 1;
                self.touch(key);
                if self.trace {
                    debug!(op = key.op, inputs = ?key.inputs, "cache hit");
                }
                Some(image)
            }
            None => {
                self.misses += 1;
                if self.trace {
                    debug!(op = key.op, inputs = ?key.inputs, "cache miss");
                }
                None
            }
        }
    }

    /// Stores an output, evicting LRU entries to stay within both limits.
    ///
    /// Outputs larger than the memory ceiling are not stored.
    pub fn insert(&mut self, key: OpKey, image: VImage) {
        let size_bytes = image.bytes();
        if self.max_ops == 0 || size_bytes > self.max_bytes {
            if self.trace {
                debug!(op = key.op, size = %format_bytes(size_bytes), "cache skip");
            }
            return;
        }

        if let Some(old) = self.entries.remove(&key) {
            self.total_bytes = self.total_bytes.saturating_sub(old.size_bytes);
            self.access_order.retain(|k| k != &key);
        }

        while !self.entries.is_empty()
            && (self.total_bytes + size_bytes > self.max_bytes || self.entries.len() >= self.max_ops)
        {
            self.evict_lru();
        }

        if self.trace {
            debug!(op = key.op, inputs = ?key.inputs, size = %format_bytes(size_bytes), "cache insert");
        }
        self.access_order.push_back(key.clone());
        self.entries.insert(key, Entry { image, size_bytes });
        self.total_bytes += size_bytes;
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        if self.trace && !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "cache drop all");
        }
        self.entries.clear();
        self.access_order.clear();
        self.total_bytes = 0;
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self.access_order.pop_front() {
            if let Some(entry) = self.entries.remove(&key) {
                self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
                if self.trace {
                    debug!(op = key.op, size = %format_bytes(entry.size_bytes), "cache evict");
                }
            }
        }
    }

    fn trim(&mut self) {
        while !self.entries.is_empty()
            && (self.total_bytes > self.max_bytes || self.entries.len() > self.max_ops)
        {
            self.evict_lru();
        }
    }

    fn touch(&mut self, key: &OpKey) {
        self.access_order.retain(|k| k != key);
        self.access_order.push_back(key.clone());
    }

    /// Sets the memory ceiling, evicting as needed.
    pub fn set_max_bytes(&mut self, max_bytes: u64) {
        self.max_bytes = max_bytes;
        self.trim();
    }

    /// Sets the entry ceiling, evicting as needed.
    pub fn set_max_ops(&mut self, max_ops: usize) {
        self.max_ops = max_ops;
        self.trim();
    }

    /// Turns cache event logging on or off.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// Bytes held by cached outputs.
    pub fn size_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Memory ceiling.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Entry ceiling.
    pub fn max_ops(&self) -> usize {
        self.max_ops
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache hit count.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Cache miss count.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Whether cache tracing is on.
    pub fn trace(&self) -> bool {
        self.trace
    }
}

impl Default for OpCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide operation cache.
pub(crate) fn global() -> &'static Mutex<OpCache> {
    static CACHE: OnceLock<Mutex<OpCache>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(OpCache::new()))
}

/// Runs `f` on the process-wide cache, recovering from a poisoned lock.
pub(crate) fn with<R>(f: impl FnOnce(&mut OpCache) -> R) -> R {
    let mut cache = global().lock().unwrap_or_else(|e| e.into_inner());
    f(&mut cache)
}
