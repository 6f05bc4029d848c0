//! # imgpipe-core
//!
//! Shared value types for the imgpipe image pipeline.
//!
//! Everything here is plain data: no engine state, no native handles. The
//! engine (`imgpipe-engine`) and the orchestration layer (`imgpipe`) both
//! speak in these types.
//!
//! - [`ImageFormat`] - Encoded formats the pipeline can recognize
//! - [`Interpretation`] - Colour-space semantics of an image's bands
//! - [`Color`] - RGB triple used for backgrounds and flattening
//! - [`Angle`], [`Direction`], [`Extend`], [`Interpolator`], [`Area`] - Geometry parameters
//! - [`SaveOptions`], [`GaussianBlur`], [`Sharpen`] - Operation parameters
//! - [`MemoryStats`], [`LifecycleState`] - Engine observability
//! - [`Error`] / [`Result`] - The pipeline error taxonomy
//!
//! ## Crate Structure
//!
//! ```text
//! imgpipe-core (this crate)
//!    ^
//!    +-- imgpipe-engine (nodes, kernels, codecs)
//!    +-- imgpipe (handles, operations, normalizer, encoder dispatch)
//!    +-- imgpipe-cli
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod color;
pub mod error;
pub mod format;
pub mod geometry;
pub mod options;
pub mod stats;

pub use color::{Color, Interpretation};
pub use error::{Error, Result};
pub use format::{ImageFormat, SupportedFormat};
pub use geometry::{Angle, Area, Direction, Extend, Interpolator, MAX_DIMENSION};
pub use options::{GaussianBlur, SaveOptions, Sharpen};
pub use stats::{LifecycleState, MemoryStats};
