//! Colour-space conversion, alpha flattening and profile removal.
//!
//! Conversions go through normalized, gamma-encoded RGB. They are not colour
//! managed: embedded profiles are carried along but never applied.

use imgpipe_core::Interpretation;

use crate::error::{OpError, OpResult, Status};
use crate::image::{Meta, VImage};
use crate::operation::{call, Params};

use super::par_rows;

/// Returns true if the engine can convert this image to another colour space.
pub fn colourspace_issupported(img: &VImage) -> bool {
    let interpretation = img.interpretation();
    interpretation.is_convertible()
        && interpretation
            .colour_bands()
            .is_some_and(|colour| img.bands() >= colour)
}

fn srgb_encode(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

fn srgb_decode(v: f32) -> f32 {
    if v <= 0.040_45 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Pixel to normalized RGB plus optional normalized alpha.
fn to_rgb(interpretation: Interpretation, px: &[f32], alpha: bool) -> ([f32; 3], Option<f32>) {
    let max = interpretation.max_value();
    let alpha = alpha.then(|| px[px.len() - 1] / max);
    let rgb = match interpretation {
        Interpretation::Bw | Interpretation::Grey16 => {
            let g = px[0] / max;
            [g, g, g]
        }
        Interpretation::Scrgb => [srgb_encode(px[0]), srgb_encode(px[1]), srgb_encode(px[2])],
        Interpretation::Cmyk => {
            let k = px[3] / max;
            [
                (1.0 - px[0] / max) * (1.0 - k),
                (1.0 - px[1] / max) * (1.0 - k),
                (1.0 - px[2] / max) * (1.0 - k),
            ]
        }
        _ => [px[0] / max, px[1] / max, px[2] / max],
    };
    (rgb, alpha)
}

/// Normalized RGB plus alpha to a pixel of `target`.
fn from_rgb(target: Interpretation, rgb: [f32; 3], alpha: Option<f32>, out: &mut [f32]) {
    let max = target.max_value();
    let [r, g, b] = rgb.map(|v| v.clamp(0.0, 1.0));
    let colour = match target {
        Interpretation::Bw | Interpretation::Grey16 => {
            out[0] = (0.2126 * r + 0.7152 * g + 0.0722 * b) * max;
            1
        }
        Interpretation::Scrgb => {
            out[..3].copy_from_slice(&[srgb_decode(r), srgb_decode(g), srgb_decode(b)]);
            3
        }
        Interpretation::Cmyk => {
            let k = 1.0 - r.max(g).max(b);
            if k >= 1.0 {
                out[..4].copy_from_slice(&[0.0, 0.0, 0.0, max]);
            } else {
                let inv = 1.0 - k;
                out[..4].copy_from_slice(&[
                    (1.0 - r - k) / inv * max,
                    (1.0 - g - k) / inv * max,
                    (1.0 - b - k) / inv * max,
                    k * max,
                ]);
            }
            4
        }
        _ => {
            out[..3].copy_from_slice(&[r * max, g * max, b * max]);
            3
        }
    };
    if let Some(a) = alpha {
        out[colour] = a.clamp(0.0, 1.0) * max;
    }
}

/// Converts to `target`. Converting to the current interpretation returns an
/// unchanged copy.
pub fn colourspace(img: &VImage, target: Interpretation) -> Status<VImage> {
    call("colourspace", &[img], Params::new().text(target.nick()), || {
        colourspace_kernel(img, target)
    })
}

pub(crate) fn colourspace_kernel(img: &VImage, target: Interpretation) -> OpResult<VImage> {
    let source = img.interpretation();
    if !colourspace_issupported(img) || !target.is_convertible() {
        return Err(OpError::new(
            "colourspace",
            format!("no known route from '{source}' to '{target}'"),
        ));
    }
    if source == target {
        return Ok(img.copy());
    }
    let alpha = img.has_alpha();
    let colour_out = target.colour_bands().unwrap_or(3) as usize;
    let out_bands = colour_out + alpha as usize;
    let w = img.width() as usize;
    let mut out = vec![0.0f32; w * img.height() as usize * out_bands];
    par_rows(&mut out, w * out_bands, |y, row| {
        for x in 0..w {
            let (rgb, a) = to_rgb(source, img.pixel(x, y), alpha);
            from_rgb(target, rgb, a, &mut row[x * out_bands..(x + 1) * out_bands]);
        }
    });
    VImage::from_samples(img.width(), img.height(), out_bands as u32, target, out, img.meta().clone())
}

/// Composites alpha onto a constant background and drops the alpha band.
/// `background` is in the image's native range. Images without alpha come
/// back unchanged.
pub fn flatten(img: &VImage, background: &[f64]) -> Status<VImage> {
    call("flatten", &[img], Params::new().floats(background), || {
        flatten_kernel(img, background)
    })
}

fn flatten_kernel(img: &VImage, background: &[f64]) -> OpResult<VImage> {
    if !img.has_alpha() {
        return Ok(img.copy());
    }
    let bands = img.bands() as usize;
    let colour = bands - 1;
    let max = img.interpretation().max_value();
    let bg: Vec<f32> = (0..colour)
        .map(|b| match background.len() {
            0 => 0.0,
            1 => background[0] as f32,
            n if b < n => background[b] as f32,
            _ => 0.0,
        })
        .collect();
    let w = img.width() as usize;
    let mut out = vec![0.0f32; w * img.height() as usize * colour];
    par_rows(&mut out, w * colour, |y, row| {
        for x in 0..w {
            let px = img.pixel(x, y);
            let a = (px[colour] / max).clamp(0.0, 1.0);
            for c in 0..colour {
                row[x * colour + c] = px[c] * a + bg[c] * (1.0 - a);
            }
        }
    });
    VImage::from_samples(
        img.width(),
        img.height(),
        colour as u32,
        img.interpretation(),
        out,
        img.meta().clone(),
    )
}

/// Same pixels, no embedded ICC profile.
pub fn remove_profile(img: &VImage) -> Status<VImage> {
    call("remove_profile", &[img], Params::new(), || {
        Ok(img.share(
            img.interpretation(),
            Meta { icc: None, ..img.meta().clone() },
        ))
    })
}
