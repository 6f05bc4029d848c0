//! # imgpipe
//!
//! Image transformation pipelines over the `imgpipe-engine` node graph.
//!
//! The engine works on shared, reference-counted nodes and reports failures
//! through a per-thread error buffer. This crate puts a strict ownership
//! discipline on top of it:
//!
//! - [`ImageHandle`] owns exactly one node and cannot be cloned.
//! - Every operation in [`ops`] takes its input handles by value and
//!   releases them before returning, on success and on failure.
//! - Every engine failure goes through [`error::capture`] on the thread that
//!   saw it and becomes an [`Error::EngineFailure`] carrying the engine's
//!   message.
//! - [`Runtime`] owns the process-wide engine lifecycle.
//!
//! ## Quick Start
//!
//! ```ignore
//! use imgpipe::{ops, save, Angle, ImageFormat, ImageHandle, Runtime, SaveOptions};
//!
//! let runtime = Runtime::global();
//! runtime.initialize()?;
//!
//! let (img, _format) = ImageHandle::load(runtime, &bytes)?;
//! let img = ops::rotate(img, Angle::D90)?;
//! let img = ops::extract(img, 0, 0, 256, 256)?;
//! let png = save(img, &SaveOptions::new(ImageFormat::Png))?;
//! ```
//!
//! ## Pipeline order
//!
//! ```text
//! bytes -> sniff -> load -> op -> op -> ... -> pre_save_normalize -> encode -> bytes
//! ```
//!
//! Each arrow hands over sole ownership of one handle. [`Pipeline`] runs the
//! same chain from a serializable description.

pub mod config;
pub mod encode;
pub mod error;
pub mod handle;
pub mod normalize;
pub mod ops;
pub mod pipeline;
pub mod runtime;
pub mod sniff;

pub use config::EngineConfig;
pub use encode::{encode, save};
pub use error::capture;
pub use handle::ImageHandle;
pub use normalize::pre_save_normalize;
pub use ops::{ImageWatermark, TextWatermark, WatermarkSpec};
pub use pipeline::{Operation, Pipeline};
pub use runtime::{Runtime, MIN_ENGINE_VERSION};
pub use sniff::{
    colourspace_supported_of, format_name, interpretation_of, is_svg, is_type_name_supported,
    is_type_name_supported_save, is_type_supported, is_type_supported_save, sniff, supported,
};

pub use imgpipe_core::{
    Angle, Area, Color, Direction, Error, Extend, GaussianBlur, ImageFormat, Interpolator, Interpretation,
    LifecycleState, MemoryStats, Result, SaveOptions, Sharpen, SupportedFormat, MAX_DIMENSION,
};
