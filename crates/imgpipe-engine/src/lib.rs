//! Reference-counted image processing engine.
//!
//! Images are immutable nodes shared through counted [`VImage`] references.
//! Operations take their inputs by reference and return a fresh node; the
//! caller decides when to drop what. Pixel work runs on a process-wide rayon
//! pool, and results are memoized in a bounded operation cache.
//!
//! Failures follow a C-style protocol: a fallible call returns
//! `Err(`[`Fault`]`)` and appends `"<domain>: <message>\n"` to the calling
//! thread's error buffer. Read it with [`error_buffer`], reset it with
//! [`error_clear`], and release the thread's engine state with
//! [`thread_shutdown`].
//!
//! # Architecture
//!
//! ```text
//! runtime (init / shutdown / concurrency / cache limits)
//!     └── operation::call (pool check, cache lookup, compute, error record)
//!             ├── ops::*      (geometry, arithmetic, convolution, colour, text, watermark)
//!             └── foreign::*  (jpeg, png, webp, tiff, generic loaders; jpeg, png, webp savers)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use imgpipe_engine as engine;
//!
//! engine::init("example")?;
//! let name = engine::foreign_find_load_buffer(&bytes).ok_or(engine::Fault)?;
//! let img = engine::load_buffer(name, &bytes, 1)?;
//! let small = engine::shrink(&img, 2, 2)?;
//! let jpeg = engine::jpegsave_buffer(&small, 80, false, false)?;
//! ```

mod cache;
pub mod error;
pub mod foreign;
mod image;
mod memory;
mod operation;
pub mod ops;
pub mod runtime;

pub use crate::cache::{DEFAULT_MAX_MEM, DEFAULT_MAX_OPS};
pub use crate::error::{error, error_buffer, error_clear, thread_shutdown, Fault, Status};
pub use crate::foreign::{
    foreign_find_load_buffer, has_operation, GENERIC_LOADER, jpegsave_buffer, load_buffer, pngsave_buffer,
    webpsave_buffer,
};
pub use crate::image::{live_images, Meta, VImage, WeakImage, MAX_COORD};
pub use crate::memory::{format_bytes, stats as memory_stats};
pub use crate::ops::arithmetic::{add, bandjoin, divide, extract_band, ifthenelse, linear, multiply};
pub use crate::ops::colour::{colourspace, colourspace_issupported, flatten, remove_profile};
pub use crate::ops::convolution::{gaussblur, sharpen};
pub use crate::ops::create::black;
pub use crate::ops::geometry::{
    affine, embed, extract_area, flip, insert, interpolator_window_size, replicate, rot, shrink,
    zoom,
};
pub use crate::ops::text::text;
pub use crate::ops::watermark::{watermark_image, watermark_text, TextWatermark};
pub use crate::runtime::{
    cache_bytes, cache_drop_all, cache_set_max, cache_set_max_mem, cache_set_trace, cache_size,
    concurrency_get, concurrency_set, init, is_initialized, print_all, shutdown, version, VERSION,
};
