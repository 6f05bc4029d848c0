//! Operations on owned handles.
//!
//! Every function here takes its input handles by value and returns a new
//! one. Inputs are released before the function returns whether the engine
//! call succeeded or not, so a failed step never leaks a node and a consumed
//! handle can never be read again.
//!
//! Two permissive policies are kept on purpose and logged at `warn`:
//! [`extract`] clamps a negative origin to zero, and [`embed_mode`] maps an
//! out-of-range extend mode to [`Extend::Background`].

use imgpipe_core::{
    Angle, Area, Color, Direction, Error, Extend, GaussianBlur, Interpretation, Result, Sharpen, MAX_DIMENSION,
};
use imgpipe_engine::{self as engine, VImage};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::Capture;
use crate::handle::ImageHandle;
use crate::runtime::Runtime;

/// Font used when a text watermark names none.
pub const DEFAULT_FONT: &str = "sans 10";

/// Rendering resolution used when a text watermark gives none.
pub const DEFAULT_DPI: i32 = 150;

/// Opacity used when a text watermark gives none.
pub const DEFAULT_OPACITY: f32 = 0.25;

// =============================================================================
// Geometry
// =============================================================================

/// Rotates by a multiple of 90 degrees.
pub fn rotate(handle: ImageHandle, angle: Angle) -> Result<ImageHandle> {
    trace!(angle = angle.degrees(), "rotate");
    handle.apply(|img| engine::rot(img, angle))
}

/// Mirrors horizontally or vertically.
pub fn flip(handle: ImageHandle, direction: Direction) -> Result<ImageHandle> {
    trace!(?direction, "flip");
    handle.apply(|img| engine::flip(img, direction))
}

/// Integer upsampling by pixel replication, `factor` times in both axes.
pub fn zoom(handle: ImageHandle, factor: i32) -> Result<ImageHandle> {
    trace!(factor, "zoom");
    handle.apply(|img| engine::zoom(img, factor, factor))
}

/// Crops to the given rectangle.
///
/// Fails with [`Error::SizeExceeded`] when `width` or `height` is above
/// [`MAX_DIMENSION`]. A negative `left` or `top` is moved to zero.
pub fn extract(handle: ImageHandle, left: i32, top: i32, width: i32, height: i32) -> Result<ImageHandle> {
    let requested = Area::new(left, top, width, height);
    if requested.exceeds_limit() {
        handle.release();
        return Err(Error::SizeExceeded { width, height, limit: MAX_DIMENSION });
    }
    let area = requested.clamped();
    if area != requested {
        warn!(left, top, "negative crop origin clamped to zero");
    }
    trace!(left = area.left, top = area.top, width, height, "extract");
    handle.apply(|img| engine::extract_area(img, area.left, area.top, area.width, area.height))
}

/// Places the image at (left, top) on a `width` x `height` canvas filled per
/// `extend`. `background` is used by [`Extend::Background`].
pub fn embed(
    handle: ImageHandle,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    extend: Extend,
    background: Color,
) -> Result<ImageHandle> {
    trace!(left, top, width, height, ?extend, "embed");
    handle.apply(|img| {
        let fill = native_background(img, background, true);
        engine::embed(img, left, top, width, height, extend, &fill)
    })
}

/// [`embed`] with a raw mode number and a white background.
///
/// Modes outside 0..=5 fall back to [`Extend::Background`].
pub fn embed_mode(handle: ImageHandle, left: i32, top: i32, width: i32, height: i32, mode: i32) -> Result<ImageHandle> {
    if !Extend::is_valid_raw(mode) {
        warn!(mode, "unknown extend mode, using background");
    }
    embed(handle, left, top, width, height, Extend::from_raw(mode), Color::WHITE)
}

/// Pastes `sub` onto `main` at (left, top). Consumes both.
pub fn insert(main: ImageHandle, sub: ImageHandle, left: i32, top: i32) -> Result<ImageHandle> {
    trace!(left, top, "insert");
    main.apply2(sub, |m, s| engine::insert(m, s, left, top))
}

/// Scales by (`residual_x`, `residual_y`) with the named interpolator.
///
/// Unknown interpolator names fail in the engine.
pub fn affine(handle: ImageHandle, residual_x: f64, residual_y: f64, interpolator: &str) -> Result<ImageHandle> {
    trace!(residual_x, residual_y, interpolator, "affine");
    handle.apply(|img| engine::affine(img, [residual_x, 0.0, 0.0, residual_y], interpolator))
}

/// Box-filter downsampling by an integer `factor`.
pub fn shrink(handle: ImageHandle, factor: i32) -> Result<ImageHandle> {
    trace!(factor, "shrink");
    handle.apply(|img| engine::shrink(img, factor, factor))
}

/// Replaces `handle` with `bytes` decoded at 1/`factor` scale.
///
/// `bytes` must be the JPEG `handle` was loaded from; `factor` is 2, 4 or 8.
pub fn shrink_jpeg(bytes: &[u8], handle: ImageHandle, factor: u32) -> Result<ImageHandle> {
    trace!(factor, "shrink_jpeg");
    let runtime = handle.runtime().clone();
    handle.release();
    ImageHandle::load_shrunk(&runtime, bytes, factor).map(|(handle, _)| handle)
}

// =============================================================================
// Filters
// =============================================================================

/// Gaussian blur.
pub fn gaussian_blur(handle: ImageHandle, blur: GaussianBlur) -> Result<ImageHandle> {
    trace!(sigma = blur.sigma, min_ampl = blur.min_ampl, "gaussian_blur");
    handle.apply(|img| engine::gaussblur(img, blur.sigma, blur.min_ampl))
}

/// Unsharp mask. The mask's sigma is derived from the radius.
pub fn sharpen(handle: ImageHandle, params: Sharpen) -> Result<ImageHandle> {
    let sigma = f64::from(1 + params.radius / 2);
    trace!(radius = params.radius, sigma, "sharpen");
    handle.apply(|img| engine::sharpen(img, sigma, params.x1, params.y2, params.y3, params.m1, params.m2))
}

// =============================================================================
// Bands and arithmetic
// =============================================================================

/// Keeps `count` bands starting at `first`.
pub fn extract_band(handle: ImageHandle, first: i32, count: i32) -> Result<ImageHandle> {
    trace!(first, count, "extract_band");
    handle.apply(|img| engine::extract_band(img, first, count))
}

/// Appends the bands of `b` to those of `a`. Consumes both.
pub fn band_join(a: ImageHandle, b: ImageHandle) -> Result<ImageHandle> {
    trace!("band_join");
    a.apply2(b, engine::bandjoin)
}

/// `pixel * a + b`, per band. Single-element slices apply to every band.
pub fn linear(handle: ImageHandle, a: &[f64], b: &[f64]) -> Result<ImageHandle> {
    trace!(?a, ?b, "linear");
    handle.apply(|img| engine::linear(img, a, b))
}

/// Element-wise sum. Consumes both.
pub fn add(left: ImageHandle, right: ImageHandle) -> Result<ImageHandle> {
    trace!("add");
    left.apply2(right, engine::add)
}

/// Element-wise product. Consumes both.
pub fn multiply(left: ImageHandle, right: ImageHandle) -> Result<ImageHandle> {
    trace!("multiply");
    left.apply2(right, engine::multiply)
}

/// Element-wise quotient. Consumes both.
pub fn divide(left: ImageHandle, right: ImageHandle) -> Result<ImageHandle> {
    trace!("divide");
    left.apply2(right, engine::divide)
}

/// Picks `then` where `cond` is set and `otherwise` elsewhere, or mixes
/// them by `cond` when `blend` is on. Consumes all three.
pub fn select_blend(cond: ImageHandle, then: ImageHandle, otherwise: ImageHandle, blend: bool) -> Result<ImageHandle> {
    trace!(blend, "select_blend");
    cond.apply3(then, otherwise, |c, t, e| engine::ifthenelse(c, t, e, blend))
}

// =============================================================================
// Creation and colour
// =============================================================================

/// New zero-filled image.
pub fn black(runtime: &Runtime, width: i32, height: i32, bands: i32) -> Result<ImageHandle> {
    trace!(width, height, bands, "black");
    runtime.ensure_ready()?;
    let image = engine::black(width, height, bands).captured()?;
    Ok(ImageHandle::new(image, runtime.clone()))
}

/// Composites alpha onto `background` and drops the alpha band. Images
/// without alpha pass through as a fresh handle.
pub fn flatten(handle: ImageHandle, background: Color) -> Result<ImageHandle> {
    trace!(?background, "flatten");
    handle.apply(|img| engine::flatten(img, &native_background(img, background, false)))
}

/// Converts to `target`.
pub fn colourspace(handle: ImageHandle, target: Interpretation) -> Result<ImageHandle> {
    trace!(%target, "colourspace");
    handle.apply(|img| engine::colourspace(img, target))
}

/// Removes any embedded ICC profile.
pub fn remove_profile(handle: ImageHandle) -> Result<ImageHandle> {
    trace!("remove_profile");
    handle.apply(engine::remove_profile)
}

/// `color` as a background vector in `img`'s native range, one value per
/// colour band, plus an opaque alpha value when `alpha` is set and `img`
/// has an alpha band.
fn native_background(img: &VImage, color: Color, alpha: bool) -> Vec<f64> {
    let interpretation = img.interpretation();
    let max = f64::from(interpretation.max_value());
    let scale = max / 255.0;
    let [r, g, b] = color.to_array();
    let mut out = match interpretation {
        Interpretation::Bw | Interpretation::Grey16 => vec![(0.2126 * r + 0.7152 * g + 0.0722 * b) * scale],
        Interpretation::Cmyk => {
            let k = 1.0 - r.max(g).max(b) / 255.0;
            let ink = |v: f64| if k >= 1.0 { 0.0 } else { (1.0 - v / 255.0 - k) / (1.0 - k) * 255.0 };
            vec![ink(r), ink(g), ink(b), k * 255.0]
        }
        _ => vec![r * scale, g * scale, b * scale],
    };
    if alpha && img.has_alpha() {
        out.push(max);
    }
    out
}

// =============================================================================
// Watermarks
// =============================================================================

/// Text overlay. Zero or empty fields take defaults from the image when the
/// watermark is applied; see [`TextWatermark::resolved`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextWatermark {
    /// Text to render. Empty text leaves the image unchanged.
    pub text: String,
    /// Font description, e.g. `"sans 10"`.
    pub font: String,
    /// Wrap width in pixels.
    pub width: i32,
    /// Rendering resolution.
    pub dpi: i32,
    /// Gap between repeated tiles.
    pub margin: i32,
    /// Offset of the first tile.
    pub left: i32,
    /// Offset of the first tile.
    pub top: i32,
    /// Ink strength, 0..=1.
    pub opacity: f32,
    /// Draw a single tile instead of covering the image.
    pub no_replicate: bool,
    /// Text colour.
    pub background: Color,
}

impl TextWatermark {
    /// Watermark drawing `text` with every other field defaulted.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    /// Copy with defaults applied for an image `image_width` pixels wide:
    /// width a sixth of the image, 150 dpi, margin equal to the width, font
    /// [`DEFAULT_FONT`], opacity 0.25. Opacity above 1 is capped.
    pub fn resolved(&self, image_width: u32) -> Self {
        let mut out = self.clone();
        if out.font.is_empty() {
            out.font = DEFAULT_FONT.to_string();
        }
        if out.width == 0 {
            out.width = (image_width / 6) as i32;
        }
        if out.dpi == 0 {
            out.dpi = DEFAULT_DPI;
        }
        if out.margin == 0 {
            out.margin = out.width;
        }
        if out.opacity == 0.0 {
            out.opacity = DEFAULT_OPACITY;
        } else if out.opacity > 1.0 {
            out.opacity = 1.0;
        }
        out
    }
}

/// Image overlay. The overlay handle is consumed with the base image.
#[derive(Debug)]
pub struct ImageWatermark {
    /// Image drawn on top.
    pub overlay: ImageHandle,
    /// Offset of the overlay.
    pub left: i32,
    /// Offset of the overlay.
    pub top: i32,
    /// Scale applied to the overlay's alpha, 0..=1.
    pub opacity: f32,
}

/// What to composite onto an image.
#[derive(Debug)]
pub enum WatermarkSpec {
    /// Rendered text.
    Text(TextWatermark),
    /// Another image.
    Image(ImageWatermark),
}

impl From<TextWatermark> for WatermarkSpec {
    fn from(text: TextWatermark) -> Self {
        WatermarkSpec::Text(text)
    }
}

impl From<ImageWatermark> for WatermarkSpec {
    fn from(image: ImageWatermark) -> Self {
        WatermarkSpec::Image(image)
    }
}

/// Composites `mark` onto `handle`.
pub fn watermark(handle: ImageHandle, mark: impl Into<WatermarkSpec>) -> Result<ImageHandle> {
    match mark.into() {
        WatermarkSpec::Text(text) => watermark_text(handle, &text),
        WatermarkSpec::Image(image) => {
            let ImageWatermark { overlay, left, top, opacity } = image;
            let opacity = if opacity <= 0.0 { 1.0 } else { opacity.min(1.0) };
            trace!(left, top, opacity, "watermark_image");
            handle.apply2(overlay, |img, over| engine::watermark_image(img, over, left, top, opacity))
        }
    }
}

fn watermark_text(handle: ImageHandle, text: &TextWatermark) -> Result<ImageHandle> {
    let resolved = text.resolved(handle.width());
    trace!(
        chars = resolved.text.chars().count(),
        font = %resolved.font,
        width = resolved.width,
        dpi = resolved.dpi,
        "watermark_text"
    );
    handle.apply(|img| {
        let opts = engine::TextWatermark {
            text: &resolved.text,
            font: &resolved.font,
            width: resolved.width,
            dpi: resolved.dpi,
            margin: resolved.margin,
            left: resolved.left,
            top: resolved.top,
            replicate: !resolved.no_replicate,
            opacity: resolved.opacity,
            ink: resolved.background.to_array(),
        };
        engine::watermark_text(img, &opts)
    })
}
