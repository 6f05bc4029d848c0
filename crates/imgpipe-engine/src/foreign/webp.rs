//! WebP load and lossless save through the `image` crate.

use std::io::Cursor;

use tracing::trace;

use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};

use crate::error::{OpError, OpResult, Status};
use crate::image::{Meta, VImage};
use crate::operation::call_uncached;

use super::{interpretation_for, no_shrink, to_u8};

pub(super) fn is_a(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

pub(super) fn load(bytes: &[u8], shrink: u32) -> OpResult<VImage> {
    no_shrink("webpload", shrink)?;
    let img = ImageReader::with_format(Cursor::new(bytes), ImageFormat::WebP)
        .decode()
        .map_err(|e| OpError::new("webpload", e.to_string()))?;
    from_dynamic("webpload", img)
}

/// Node from a decoded `image` buffer, narrowed to 8 bits per sample.
pub(super) fn from_dynamic(domain: &'static str, img: DynamicImage) -> OpResult<VImage> {
    let (width, height) = (img.width(), img.height());
    let (bands, data) = match img {
        DynamicImage::ImageLuma8(grey) => (1, grey.into_raw()),
        DynamicImage::ImageLumaA8(grey) => (2, grey.into_raw()),
        DynamicImage::ImageRgb8(rgb) => (3, rgb.into_raw()),
        DynamicImage::ImageRgba8(rgba) => (4, rgba.into_raw()),
        other if other.color().has_alpha() => (4, other.to_rgba8().into_raw()),
        other => (3, other.to_rgb8().into_raw()),
    };
    super::from_u8(domain, width, height, bands, interpretation_for(bands, false), &data, Meta::default())
}

/// Encodes as lossless WebP. `quality` is accepted for symmetry with the
/// lossy savers and has no effect; no metadata is written.
pub fn webpsave_buffer(img: &VImage, quality: i32, strip: bool) -> Status<Vec<u8>> {
    trace!(quality, strip, "webpsave: lossless, quality and strip not applied");
    call_uncached("webpsave", || save(img))
}

fn save(img: &VImage) -> OpResult<Vec<u8>> {
    let color = match img.bands() {
        1 => ExtendedColorType::L8,
        2 => ExtendedColorType::La8,
        3 => ExtendedColorType::Rgb8,
        4 => ExtendedColorType::Rgba8,
        n => {
            return Err(OpError::new("webpsave", format!("cannot save {n}-band image as WebP")));
        }
    };
    let data = to_u8(img, img.bands() as usize);
    let mut buf = Vec::new();
    let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut buf);
    encoder
        .write_image(&data, img.width(), img.height(), color)
        .map_err(|e| OpError::new("webpsave", e.to_string()))?;
    Ok(buf)
}
