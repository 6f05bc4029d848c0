//! Catch-all loader for formats without a dedicated one (GIF, BMP).
//!
//! Only formats this build can actually decode are claimed, so the
//! registry never answers for bytes it would then fail on.

use image::ImageFormat;

use crate::error::{OpError, OpResult};
use crate::image::VImage;

use super::no_shrink;

const FORMATS: [ImageFormat; 2] = [ImageFormat::Gif, ImageFormat::Bmp];

pub(super) fn is_a(bytes: &[u8]) -> bool {
    image::guess_format(bytes).is_ok_and(|f| FORMATS.contains(&f))
}

pub(super) fn load(bytes: &[u8], shrink: u32) -> OpResult<VImage> {
    no_shrink("magickload", shrink)?;
    let format = image::guess_format(bytes)
        .ok()
        .filter(|f| FORMATS.contains(f))
        .ok_or_else(|| OpError::new("magickload", "unrecognized image format"))?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| OpError::new("magickload", e.to_string()))?;
    super::webp::from_dynamic("magickload", img)
}
