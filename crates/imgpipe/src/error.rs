//! The error channel.
//!
//! Every failing engine call in this crate goes through [`capture`], on the
//! thread that made the call, immediately after it returned.

use imgpipe_engine as engine;
use tracing::debug;

pub use imgpipe_core::{Error, Result};

/// Turns an engine failure into [`Error::EngineFailure`].
///
/// Reads the calling thread's error buffer, clears it, then releases the
/// thread's engine state. An empty buffer yields `"unknown engine error"`.
pub fn capture(_fault: engine::Fault) -> Error {
    let buffer = engine::error_buffer();
    engine::error_clear();
    engine::thread_shutdown();

    let message = buffer.trim_end();
    let message = if message.is_empty() { "unknown engine error" } else { message };
    debug!(message, "engine failure");
    Error::EngineFailure(message.to_string())
}

/// `?`-friendly form of [`capture`] for engine results.
pub(crate) trait Capture<T> {
    fn captured(self) -> Result<T>;
}

impl<T> Capture<T> for engine::Status<T> {
    fn captured(self) -> Result<T> {
        self.map_err(capture)
    }
}
