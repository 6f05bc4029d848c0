//! Loaders and savers wrapping the codec crates.
//!
//! Loaders sit in a fixed registry probed in order by
//! [`foreign_find_load_buffer`]. Each entry pairs a cheap header check with a
//! decode function, the same shape as a format registry with `can_read` and
//! `read_memory` hooks. Savers are plain functions, one per output format.
//!
//! Decoded samples land in the node's native range: 8-bit data as 0..255,
//! 16-bit data as 0..65535.

use std::sync::Arc;

use imgpipe_core::Interpretation;

use crate::error::{OpError, OpResult, Status};
use crate::image::{check_size, Meta, VImage};
use crate::operation::call_uncached;

#[cfg(feature = "generic")]
mod generic;
mod jpeg;
mod png;
mod tiff;
mod webp;

pub use jpeg::jpegsave_buffer;
pub use png::pngsave_buffer;
pub use webp::webpsave_buffer;

/// Registry name of the catch-all loader.
pub const GENERIC_LOADER: &str = "magickload_buffer";

/// One entry in the loader registry.
struct Loader {
    name: &'static str,
    is_a: fn(&[u8]) -> bool,
    load: fn(&[u8], u32) -> OpResult<VImage>,
}

/// Loaders in probe order. The generic loader goes last so the dedicated
/// ones win.
static LOADERS: &[Loader] = &[
    Loader { name: "jpegload_buffer", is_a: jpeg::is_a, load: jpeg::load },
    Loader { name: "pngload_buffer", is_a: png::is_a, load: png::load },
    Loader { name: "webpload_buffer", is_a: webp::is_a, load: webp::load },
    Loader { name: "tiffload_buffer", is_a: tiff::is_a, load: tiff::load },
    #[cfg(feature = "generic")]
    Loader { name: GENERIC_LOADER, is_a: generic::is_a, load: generic::load },
];

static SAVERS: &[&str] = &["jpegsave_buffer", "pngsave_buffer", "webpsave_buffer"];

/// Name of the first loader that claims `bytes`, if any.
pub fn foreign_find_load_buffer(bytes: &[u8]) -> Option<&'static str> {
    LOADERS.iter().find(|l| (l.is_a)(bytes)).map(|l| l.name)
}

/// Returns true if this build has a loader or saver called `name`.
pub fn has_operation(name: &str) -> bool {
    LOADERS.iter().any(|l| l.name == name) || SAVERS.contains(&name)
}

/// Decodes `bytes` with the named loader.
///
/// `shrink` is a shrink-on-load factor; only the JPEG loader accepts values
/// other than 1.
pub fn load_buffer(name: &str, bytes: &[u8], shrink: u32) -> Status<VImage> {
    call_uncached("foreign", || {
        let loader = LOADERS
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| OpError::new("foreign", format!("no such loader \"{name}\"")))?;
        (loader.load)(bytes, shrink)
    })
}

fn no_shrink(domain: &'static str, shrink: u32) -> OpResult<()> {
    if shrink == 1 {
        Ok(())
    } else {
        Err(OpError::new(domain, "shrink-on-load not supported"))
    }
}

fn interpretation_for(bands: u32, sixteen: bool) -> Interpretation {
    match (bands, sixteen) {
        (1 | 2, false) => Interpretation::Bw,
        (1 | 2, true) => Interpretation::Grey16,
        (_, false) => Interpretation::Srgb,
        (_, true) => Interpretation::Rgb16,
    }
}

fn icc_meta(icc: Option<Vec<u8>>) -> Meta {
    Meta {
        icc: icc.filter(|p| !p.is_empty()).map(Arc::new),
        orientation: 0,
    }
}

/// Node from 8-bit interleaved samples.
fn from_u8(
    domain: &'static str,
    width: u32,
    height: u32,
    bands: u32,
    interpretation: Interpretation,
    data: &[u8],
    meta: Meta,
) -> OpResult<VImage> {
    check_size(domain, width, height, bands)?;
    let expected = width as usize * height as usize * bands as usize;
    if data.len() < expected {
        return Err(OpError::new(domain, "truncated pixel data"));
    }
    let samples = data[..expected].iter().map(|&v| v as f32).collect();
    VImage::from_samples(width, height, bands, interpretation, samples, meta)
}

/// Node from 16-bit interleaved samples.
fn from_u16(
    domain: &'static str,
    width: u32,
    height: u32,
    bands: u32,
    interpretation: Interpretation,
    data: &[u16],
    meta: Meta,
) -> OpResult<VImage> {
    check_size(domain, width, height, bands)?;
    let expected = width as usize * height as usize * bands as usize;
    if data.len() < expected {
        return Err(OpError::new(domain, "truncated pixel data"));
    }
    let samples = data[..expected].iter().map(|&v| v as f32).collect();
    VImage::from_samples(width, height, bands, interpretation, samples, meta)
}

/// Samples scaled to 0..255 and rounded, keeping the first `bands` bands.
fn to_u8(img: &VImage, bands: usize) -> Vec<u8> {
    let scale = 255.0 / img.interpretation().max_value();
    let all = img.bands() as usize;
    img.pixels()
        .chunks_exact(all)
        .flat_map(|px| px[..bands].iter().map(move |v| (v * scale).round().clamp(0.0, 255.0) as u8))
        .collect()
}

/// Samples scaled to 0..65535, as big-endian bytes.
fn to_u16_be(img: &VImage) -> Vec<u8> {
    let scale = 65535.0 / img.interpretation().max_value();
    img.pixels()
        .iter()
        .flat_map(|v| ((v * scale).round().clamp(0.0, 65535.0) as u16).to_be_bytes())
        .collect()
}

/// Width and height as `u16`, for encoders limited to 65535.
fn dims_u16(domain: &'static str, img: &VImage) -> OpResult<(u16, u16)> {
    match (u16::try_from(img.width()), u16::try_from(img.height())) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(OpError::new(
            domain,
            format!("image too large to save: {}x{}", img.width(), img.height()),
        )),
    }
}

/// Colour bands of `img`, excluding alpha.
fn colour_bands(img: &VImage) -> usize {
    let bands = img.bands() as usize;
    if img.has_alpha() { bands - 1 } else { bands }
}
