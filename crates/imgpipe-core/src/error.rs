//! Error types for pipeline operations.
//!
//! Every component of the pipeline reports failures through the single
//! [`Error`] enum. Native engine failures arrive as opaque text in
//! [`Error::EngineFailure`]; everything else is classified by the
//! orchestration layer before the engine is ever called.
//!
//! # Recovery
//!
//! None of these errors are retried internally. Operations consume their
//! input handles, so the only way to recover is to start a fresh pipeline
//! from the original source bytes.
//!
//! ```rust
//! use imgpipe_core::{Error, MAX_DIMENSION};
//!
//! let err = Error::SizeExceeded { width: 20_000, height: 10, limit: MAX_DIMENSION };
//! assert!(err.to_string().contains("20000"));
//! ```

use thiserror::Error;

use crate::stats::LifecycleState;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the image pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The input bytes could not be classified as a loadable format.
    #[error("unsupported image format")]
    UnsupportedFormat,

    /// Requested geometry exceeds the hard dimension ceiling.
    #[error("maximum image size exceeded: {width}x{height} (limit {limit})")]
    SizeExceeded {
        /// Requested width
        width: i32,
        /// Requested height
        height: i32,
        /// Ceiling that was exceeded
        limit: i32,
    },

    /// Failure reported by the native engine, message passed through verbatim.
    #[error("{0}")]
    EngineFailure(String),

    /// An operation was attempted while the engine was not ready.
    #[error("engine is {0}, operation requires a ready engine")]
    LifecycleViolation(LifecycleState),
}

impl Error {
    /// Returns the engine message for [`Error::EngineFailure`].
    pub fn engine_message(&self) -> Option<&str> {
        match self {
            Error::EngineFailure(msg) => Some(msg),
            _ => None,
        }
    }
}
