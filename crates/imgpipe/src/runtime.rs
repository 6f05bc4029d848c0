//! Engine lifecycle manager.
//!
//! The engine is process-wide, so there is exactly one lifecycle state. A
//! [`Runtime`] is a handle onto it carrying the configuration to apply at
//! start-up; every handle sees the same state. Transitions are serialized on
//! one mutex, and each one runs to completion on the calling thread.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use imgpipe_core::{Error, LifecycleState, MemoryStats, Result};
use imgpipe_engine as engine;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Capture;

/// Oldest engine (major, minor) this crate runs on.
pub const MIN_ENGINE_VERSION: (u32, u32) = (0, 1);

static TRANSITION: Mutex<()> = Mutex::new(());
static STATE: RwLock<LifecycleState> = RwLock::new(LifecycleState::Uninitialized);
static GLOBAL: OnceLock<Runtime> = OnceLock::new();

fn state() -> LifecycleState {
    *STATE.read().unwrap_or_else(|e| e.into_inner())
}

fn set_state(next: LifecycleState) {
    *STATE.write().unwrap_or_else(|e| e.into_inner()) = next;
}

/// Panics when the linked engine is older than [`MIN_ENGINE_VERSION`].
fn require_version(version: (u32, u32, u32)) {
    let (major, minor, _) = version;
    if (major, minor) < MIN_ENGINE_VERSION {
        panic!(
            "unsupported engine version {}.{}; need at least {}.{}",
            major, minor, MIN_ENGINE_VERSION.0, MIN_ENGINE_VERSION.1
        );
    }
}

/// Handle onto the process-wide engine lifecycle.
#[derive(Debug, Clone)]
pub struct Runtime {
    config: Arc<EngineConfig>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Runtime {
    /// Runtime that applies `config` when it initializes the engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    /// Process-wide runtime configured from the environment, read once.
    pub fn global() -> &'static Runtime {
        GLOBAL.get_or_init(|| Runtime::new(EngineConfig::from_env()))
    }

    /// Configuration applied at initialization.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts the engine. A no-op when it is already running.
    ///
    /// # Panics
    ///
    /// If the engine version is below [`MIN_ENGINE_VERSION`]. That is a build
    /// problem, not something a caller can recover from.
    pub fn initialize(&self) -> Result<()> {
        let _guard = TRANSITION.lock().unwrap_or_else(|e| e.into_inner());
        if state().is_ready() {
            debug!("engine already initialized");
            return Ok(());
        }
        require_version(engine::version());

        let config = &self.config;
        engine::concurrency_set(config.concurrency).captured()?;
        engine::init("imgpipe").captured()?;
        engine::cache_set_max_mem(config.max_cache_mem);
        engine::cache_set_max(config.max_cache_ops);
        engine::cache_set_trace(config.cache_trace);

        set_state(LifecycleState::Ready);
        info!(
            concurrency = config.concurrency,
            max_cache_mem = config.max_cache_mem,
            max_cache_ops = config.max_cache_ops,
            trace = config.cache_trace,
            "engine initialized"
        );
        Ok(())
    }

    /// Stops the engine and drops its caches. A no-op unless running.
    ///
    /// In-flight operations must be drained first.
    pub fn shutdown(&self) {
        let _guard = TRANSITION.lock().unwrap_or_else(|e| e.into_inner());
        if !state().is_ready() {
            debug!(state = %state(), "shutdown skipped");
            return;
        }
        set_state(LifecycleState::ShuttingDown);
        engine::shutdown();
        set_state(LifecycleState::Stopped);
        info!("engine shut down");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        state()
    }

    /// Returns true while the engine accepts operations.
    pub fn is_ready(&self) -> bool {
        state().is_ready()
    }

    /// Fails with [`Error::LifecycleViolation`] unless the engine is ready.
    pub fn ensure_ready(&self) -> Result<()> {
        match state() {
            LifecycleState::Ready => Ok(()),
            other => Err(Error::LifecycleViolation(other)),
        }
    }

    /// Tracked engine memory, accurate as of the call.
    pub fn memory_stats(&self) -> MemoryStats {
        engine::memory_stats()
    }

    /// Writes the engine's internal state to stderr.
    pub fn debug_dump(&self) {
        let stderr = io::stderr();
        if let Err(e) = self.debug_dump_to(&mut stderr.lock()) {
            debug!(error = %e, "debug dump failed");
        }
    }

    /// Writes the engine's internal state to `out`.
    pub fn debug_dump_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "lifecycle: {}", state())?;
        engine::print_all(out)
    }

    /// Empties the operation cache.
    pub fn drop_cache(&self) {
        engine::cache_drop_all();
        debug!("operation cache dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_engine_version_is_accepted() {
        require_version(engine::version());
    }

    #[test]
    #[should_panic(expected = "unsupported engine version")]
    fn old_engine_version_panics() {
        require_version((0, 0, 9));
    }

    #[test]
    fn global_is_shared() {
        assert!(std::ptr::eq(Runtime::global(), Runtime::global()));
    }

    #[test]
    fn initialize_is_idempotent() {
        let runtime = Runtime::default();
        runtime.initialize().unwrap();
        runtime.initialize().unwrap();
        assert_eq!(runtime.state(), LifecycleState::Ready);
        assert!(runtime.ensure_ready().is_ok());
    }

    #[test]
    fn debug_dump_mentions_state() {
        let runtime = Runtime::default();
        runtime.initialize().unwrap();
        let mut out = Vec::new();
        runtime.debug_dump_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("lifecycle: ready"));
        assert!(text.contains("imgpipe-engine"));
    }
}
