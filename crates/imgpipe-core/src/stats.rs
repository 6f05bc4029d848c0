//! Engine state snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory accounting snapshot, accurate as of the call that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Bytes currently allocated for pixel data.
    pub memory: i64,
    /// Largest value `memory` has reached.
    pub memory_highwater: i64,
    /// Live pixel allocations.
    pub allocations: i64,
}

/// Lifecycle of the process-wide engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Never initialized.
    #[default]
    Uninitialized,
    /// Accepting operations.
    Ready,
    /// Shutdown in progress.
    ShuttingDown,
    /// Shut down; may be initialized again.
    Stopped,
}

impl LifecycleState {
    /// Returns true if operations may run.
    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Ready => "ready",
            LifecycleState::ShuttingDown => "shutting down",
            LifecycleState::Stopped => "stopped",
        })
    }
}
