//! Text and image watermarks.

use imgpipe_core::{Extend, Interpretation};

use crate::error::{OpError, OpResult, Status};
use crate::image::{VImage, MAX_COORD};
use crate::operation::{call, call_uncached, Params};

use super::arithmetic::{ifthenelse_kernel, linear_kernel};
use super::create::black_kernel;
use super::geometry::{embed_kernel, replicate_kernel};
use super::par_rows;

/// Parameters for a text watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct TextWatermark<'a> {
    /// Text to render. Empty text leaves the image unchanged.
    pub text: &'a str,
    /// Font description, e.g. `"sans 10"`.
    pub font: &'a str,
    /// Wrap width in pixels.
    pub width: i32,
    /// Rendering resolution.
    pub dpi: i32,
    /// Spacing added right of and below each text tile.
    pub margin: i32,
    /// Offset of the first tile.
    pub left: i32,
    /// Offset of the first tile.
    pub top: i32,
    /// Tile the text across the whole image.
    pub replicate: bool,
    /// Ink strength, 0..=1.
    pub opacity: f32,
    /// Ink colour, 8-bit RGB.
    pub ink: [f64; 3],
}

/// Ink vector for `img`: RGB scaled to the image's range, alpha opaque.
fn ink_vector(img: &VImage, rgb: [f64; 3]) -> Vec<f64> {
    let interpretation = img.interpretation();
    let max = interpretation.max_value() as f64;
    let scale = max / 255.0;
    let bands = img.bands() as usize;
    let colour = if img.has_alpha() { bands - 1 } else { bands };
    (0..bands)
        .map(|b| {
            if b >= colour {
                max
            } else if colour == 1 {
                (0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]) * scale
            } else if interpretation == Interpretation::Scrgb {
                rgb.get(b).map_or(0.0, |v| v / 255.0)
            } else {
                rgb.get(b).map_or(0.0, |v| v * scale)
            }
        })
        .collect()
}

/// Blends rendered text into the image, tiled unless `replicate` is off.
pub fn watermark_text(img: &VImage, opts: &TextWatermark<'_>) -> Status<VImage> {
    call_uncached("watermark", || watermark_text_kernel(img, opts))
}

fn watermark_text_kernel(img: &VImage, opts: &TextWatermark<'_>) -> OpResult<VImage> {
    if opts.text.is_empty() {
        return Ok(img.copy());
    }
    let mask = super::text::text_mask(opts.text, opts.font, opts.width, opts.dpi)?;
    let mask = linear_kernel(&mask, &[opts.opacity.clamp(0.0, 1.0) as f64], &[0.0])?;

    let tile_w = tile_extent(mask.width(), opts.margin)?;
    let tile_h = tile_extent(mask.height(), opts.margin)?;
    let tile = embed_kernel(&mask, 0, 0, tile_w, tile_h, Extend::Black, &[])?;

    let (w, h) = (img.width() as i32, img.height() as i32);
    let layer = if opts.replicate {
        replicate_kernel(&tile, 1 + w / tile_w, 1 + h / tile_h)?
    } else {
        tile
    };
    let cover = embed_kernel(&layer, opts.left, opts.top, w, h, Extend::Black, &[])?;

    let ink = black_kernel(w, h, img.bands() as i32)?;
    let ink = linear_kernel(&ink, &[1.0], &ink_vector(img, opts.ink))?;
    let ink = ink.share(img.interpretation(), img.meta().clone());

    ifthenelse_kernel(&cover, &ink, img, true)
}

/// Mask size plus margin, bounded by the largest image the engine builds.
fn tile_extent(size: u32, margin: i32) -> OpResult<i32> {
    let extent = i64::from(size) + i64::from(margin.max(0));
    if extent > i64::from(MAX_COORD) {
        return Err(OpError::new("watermark", format!("tile too large: {extent} pixels with margin {margin}")));
    }
    Ok(extent as i32)
}

/// Composites `overlay` onto `img` at (left, top), with the overlay's alpha
/// scaled by `opacity`.
pub fn watermark_image(img: &VImage, overlay: &VImage, left: i32, top: i32, opacity: f32) -> Status<VImage> {
    let params = Params::new().int(left as i64).int(top as i64).float(opacity as f64);
    call("watermark_image", &[img, overlay], params, || {
        watermark_image_kernel(img, overlay, left, top, opacity)
    })
}

fn watermark_image_kernel(img: &VImage, overlay: &VImage, left: i32, top: i32, opacity: f32) -> OpResult<VImage> {
    let bands = img.bands() as usize;
    let colour = if img.has_alpha() { bands - 1 } else { bands };
    let o_bands = overlay.bands() as usize;
    let o_colour = if overlay.has_alpha() { o_bands - 1 } else { o_bands };
    if o_colour != colour && o_colour != 1 {
        return Err(OpError::new(
            "watermark_image",
            format!("overlay has {o_colour} colour bands, image has {colour}"),
        ));
    }
    let opacity = opacity.clamp(0.0, 1.0);
    let o_max = overlay.interpretation().max_value();
    let scale = img.interpretation().max_value() / o_max;
    let (ow, oh) = (overlay.width() as i64, overlay.height() as i64);

    let mut out = img.pixels().to_vec();
    par_rows(&mut out, img.row_len(), |y, row| {
        let sy = y as i64 - top as i64;
        if !(0..oh).contains(&sy) {
            return;
        }
        for x in 0..img.width() as usize {
            let sx = x as i64 - left as i64;
            if !(0..ow).contains(&sx) {
                continue;
            }
            let src = overlay.pixel(sx as usize, sy as usize);
            let alpha = (if o_colour < o_bands { src[o_colour] / o_max } else { 1.0 }) * opacity;
            for c in 0..colour {
                let v = (if o_colour == 1 { src[0] } else { src[c] }) * scale;
                let dst = &mut row[x * bands + c];
                *dst = v * alpha + *dst * (1.0 - alpha);
            }
        }
    });
    VImage::from_samples(img.width(), img.height(), img.bands(), img.interpretation(), out, img.meta().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::thread_shutdown;
    use crate::ops::testutil::{engine, solid};

    fn opts(text: &str) -> TextWatermark<'_> {
        TextWatermark {
            text,
            font: "sans 10",
            width: 100,
            dpi: 72,
            margin: 10,
            left: 0,
            top: 0,
            replicate: true,
            opacity: 1.0,
            ink: [255.0, 255.0, 255.0],
        }
    }

    #[test]
    fn empty_text_passes_through() {
        engine();
        let img = solid(8, 8, &[10.0, 20.0, 30.0], Interpretation::Srgb);
        let out = watermark_text(&img, &opts("")).unwrap();
        assert_eq!(out.pixels(), img.pixels());
        assert_ne!(out.id(), img.id());
    }

    #[test]
    fn text_keeps_geometry() {
        engine();
        let img = solid(64, 32, &[0.0, 0.0, 0.0], Interpretation::Srgb);
        let out = watermark_text(&img, &opts("hi")).unwrap();
        assert_eq!((out.width(), out.height(), out.bands()), (64, 32, 3));
        assert!(out.pixels().iter().all(|v| (0.0..=255.0).contains(v)));
    }

    #[test]
    fn huge_margin_is_an_error() {
        engine();
        let img = solid(8, 8, &[10.0, 20.0, 30.0], Interpretation::Srgb);
        let wide = TextWatermark { margin: i32::MAX, ..opts("x") };
        assert!(watermark_text(&img, &wide).is_err());
        assert!(crate::error_buffer().starts_with("watermark: tile too large"));
        thread_shutdown();
    }

    #[test]
    fn tile_extent_adds_margin() {
        assert_eq!(tile_extent(20, 5).unwrap(), 25);
        assert_eq!(tile_extent(20, -5).unwrap(), 20);
        assert!(tile_extent(u32::MAX, 0).is_err());
    }

    #[test]
    fn ink_scales_to_range() {
        let rgb16 = solid(1, 1, &[0.0, 0.0, 0.0, 0.0], Interpretation::Rgb16);
        assert_eq!(ink_vector(&rgb16, [255.0, 0.0, 255.0]), vec![65535.0, 0.0, 65535.0, 65535.0]);
        let grey = solid(1, 1, &[0.0], Interpretation::Bw);
        assert!((ink_vector(&grey, [255.0, 255.0, 255.0])[0] - 255.0).abs() < 1e-9);
    }

    #[test]
    fn image_overlay_respects_opacity() {
        engine();
        let img = solid(4, 4, &[0.0, 0.0, 0.0], Interpretation::Srgb);
        let overlay = solid(2, 2, &[200.0, 200.0, 200.0, 255.0], Interpretation::Srgb);
        let out = watermark_image(&img, &overlay, 1, 1, 0.5).unwrap();
        assert_eq!(out.pixel(0, 0), &[0.0, 0.0, 0.0]);
        assert_eq!(out.pixel(1, 1), &[100.0, 100.0, 100.0]);
        assert_eq!(out.pixel(3, 3), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn image_overlay_band_mismatch() {
        engine();
        let img = solid(2, 2, &[0.0, 0.0, 0.0], Interpretation::Srgb);
        let overlay = solid(1, 1, &[1.0, 2.0], Interpretation::Multiband);
        assert!(watermark_image(&img, &overlay, 0, 0, 1.0).is_err());
        thread_shutdown();
    }
}
