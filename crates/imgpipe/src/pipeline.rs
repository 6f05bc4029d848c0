//! Declarative pipelines.
//!
//! A [`Pipeline`] is a serializable list of single-input operations plus the
//! save options. [`Pipeline::process`] runs load, every operation in order,
//! normalization and encoding on the calling thread. Each step's output is
//! the next step's only input.
//!
//! ```ignore
//! let pipeline: Pipeline = serde_json::from_str(r#"{
//!     "operations": [
//!         { "op": "rotate", "angle": "90" },
//!         { "op": "extract", "left": 0, "top": 0, "width": 64, "height": 64 }
//!     ],
//!     "save": { "format": "png" }
//! }"#)?;
//! let png = pipeline.process(Runtime::global(), &bytes)?;
//! ```

use imgpipe_core::{
    Angle, Color, Direction, Extend, GaussianBlur, ImageFormat, Interpolator, Interpretation, Result, SaveOptions,
    Sharpen,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::encode::save;
use crate::handle::ImageHandle;
use crate::ops::{self, TextWatermark};
use crate::runtime::Runtime;

fn white() -> Color {
    Color::WHITE
}

/// One step of a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// See [`ops::rotate`].
    Rotate { angle: Angle },
    /// See [`ops::flip`].
    Flip { direction: Direction },
    /// See [`ops::zoom`].
    Zoom { factor: i32 },
    /// See [`ops::shrink`].
    Shrink { factor: i32 },
    /// Shrink-on-load when it is the first step on JPEG input, a plain
    /// [`ops::shrink`] otherwise.
    ShrinkOnLoad { factor: u32 },
    /// See [`ops::extract`].
    Extract {
        left: i32,
        top: i32,
        width: i32,
        height: i32,
    },
    /// See [`ops::embed`].
    Embed {
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        #[serde(default)]
        extend: Extend,
        #[serde(default = "white")]
        background: Color,
    },
    /// See [`ops::affine`].
    Affine {
        residual_x: f64,
        residual_y: f64,
        #[serde(default)]
        interpolator: Interpolator,
    },
    /// See [`ops::gaussian_blur`].
    GaussianBlur(GaussianBlur),
    /// See [`ops::sharpen`].
    Sharpen(Sharpen),
    /// See [`ops::extract_band`].
    ExtractBand { first: i32, count: i32 },
    /// See [`ops::linear`].
    Linear { a: Vec<f64>, b: Vec<f64> },
    /// See [`ops::flatten`].
    Flatten {
        #[serde(default = "white")]
        background: Color,
    },
    /// See [`ops::colourspace`].
    Colourspace { interpretation: Interpretation },
    /// Text watermark, see [`ops::watermark`].
    Watermark(TextWatermark),
}

impl Operation {
    /// Short name, as used in the `op` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Rotate { .. } => "rotate",
            Operation::Flip { .. } => "flip",
            Operation::Zoom { .. } => "zoom",
            Operation::Shrink { .. } => "shrink",
            Operation::ShrinkOnLoad { .. } => "shrink_on_load",
            Operation::Extract { .. } => "extract",
            Operation::Embed { .. } => "embed",
            Operation::Affine { .. } => "affine",
            Operation::GaussianBlur(_) => "gaussian_blur",
            Operation::Sharpen(_) => "sharpen",
            Operation::ExtractBand { .. } => "extract_band",
            Operation::Linear { .. } => "linear",
            Operation::Flatten { .. } => "flatten",
            Operation::Colourspace { .. } => "colourspace",
            Operation::Watermark(_) => "watermark",
        }
    }

    /// Runs this step on `handle`. `source` is the loaded buffer and its
    /// format while `handle` is still the freshly loaded image.
    fn apply(&self, handle: ImageHandle, source: Option<(&[u8], ImageFormat)>) -> Result<ImageHandle> {
        match self {
            Operation::Rotate { angle } => ops::rotate(handle, *angle),
            Operation::Flip { direction } => ops::flip(handle, *direction),
            Operation::Zoom { factor } => ops::zoom(handle, *factor),
            Operation::Shrink { factor } => ops::shrink(handle, *factor),
            Operation::ShrinkOnLoad { factor } => match source {
                Some((bytes, ImageFormat::Jpeg)) if matches!(factor, 2 | 4 | 8) => {
                    ops::shrink_jpeg(bytes, handle, *factor)
                }
                _ => ops::shrink(handle, *factor as i32),
            },
            Operation::Extract { left, top, width, height } => ops::extract(handle, *left, *top, *width, *height),
            Operation::Embed { left, top, width, height, extend, background } => {
                ops::embed(handle, *left, *top, *width, *height, *extend, *background)
            }
            Operation::Affine { residual_x, residual_y, interpolator } => {
                ops::affine(handle, *residual_x, *residual_y, interpolator.name())
            }
            Operation::GaussianBlur(blur) => ops::gaussian_blur(handle, *blur),
            Operation::Sharpen(params) => ops::sharpen(handle, *params),
            Operation::ExtractBand { first, count } => ops::extract_band(handle, *first, *count),
            Operation::Linear { a, b } => ops::linear(handle, a, b),
            Operation::Flatten { background } => ops::flatten(handle, *background),
            Operation::Colourspace { interpretation } => ops::colourspace(handle, *interpretation),
            Operation::Watermark(text) => ops::watermark(handle, text.clone()),
        }
    }
}

/// Operations to run on a buffer, and how to encode the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    /// Steps, in order.
    pub operations: Vec<Operation>,
    /// Encoder settings.
    pub save: SaveOptions,
}

impl Pipeline {
    /// Empty pipeline encoding with `save`.
    pub fn new(save: SaveOptions) -> Self {
        Self { operations: Vec::new(), save }
    }

    /// Appends a step.
    pub fn then(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Decodes `bytes`, runs every step, normalizes and encodes.
    ///
    /// Stops at the first failing step; every handle created so far has
    /// been released by then.
    pub fn process(&self, runtime: &Runtime, bytes: &[u8]) -> Result<Vec<u8>> {
        let (mut handle, format) = ImageHandle::load(runtime, bytes)?;
        debug!(%format, width = handle.width(), height = handle.height(), steps = self.operations.len(), "pipeline start");
        for (i, op) in self.operations.iter().enumerate() {
            trace!(op = op.name(), "pipeline step");
            let source = (i == 0).then_some((bytes, format));
            handle = op.apply(handle, source)?;
        }
        let out = save(handle, &self.save)?;
        debug!(format = %self.save.format, bytes = out.len(), "pipeline done");
        Ok(out)
    }
}
