//! Format detection from leading bytes, plus format support queries.

use std::collections::HashMap;
use std::sync::OnceLock;

use imgpipe_core::{ImageFormat, Interpretation, Result, SupportedFormat};
use imgpipe_engine as engine;
use regex::Regex;

use crate::handle::ImageHandle;
use crate::runtime::Runtime;

/// Buffers shorter than this are never classified.
pub const MIN_SNIFF_LEN: usize = 12;

/// Classifies `bytes` by magic number.
///
/// Only the first [`MIN_SNIFF_LEN`] bytes are inspected. When none of the
/// known signatures match and generic support is compiled in, the engine's
/// loader registry gets a chance to claim the buffer.
pub fn sniff(bytes: &[u8]) -> ImageFormat {
    let Some(head) = bytes.get(..MIN_SNIFF_LEN) else {
        return ImageFormat::Unknown;
    };
    match head {
        [0x89, b'P', b'N', b'G', ..] => ImageFormat::Png,
        [0xff, 0xd8, 0xff, ..] => ImageFormat::Jpeg,
        [_, _, _, _, _, _, _, _, b'W', b'E', b'B', b'P'] => ImageFormat::Webp,
        [b'I', b'I', 0x2a, 0x00, ..] | [b'M', b'M', 0x00, 0x2a, ..] => ImageFormat::Tiff,
        _ if generic_claims(bytes) => ImageFormat::GenericNative,
        _ => ImageFormat::Unknown,
    }
}

fn generic_claims(bytes: &[u8]) -> bool {
    cfg!(feature = "generic") && engine::foreign_find_load_buffer(bytes) == Some(engine::GENERIC_LOADER)
}

/// Name of the sniffed format, `"unknown"` if it has none.
pub fn format_name(bytes: &[u8]) -> &'static str {
    sniff(bytes).name()
}

fn support_table() -> &'static HashMap<ImageFormat, SupportedFormat> {
    static TABLE: OnceLock<HashMap<ImageFormat, SupportedFormat>> = OnceLock::new();
    TABLE.get_or_init(|| {
        ImageFormat::NAMED
            .into_iter()
            .map(|format| {
                let name = format.name();
                let support = SupportedFormat {
                    load: engine::has_operation(&format!("{name}load_buffer")),
                    save: engine::has_operation(&format!("{name}save_buffer")),
                };
                (format, support)
            })
            .collect()
    })
}

/// What the engine can do with `format`. Computed once per process.
pub fn supported(format: ImageFormat) -> SupportedFormat {
    support_table().get(&format).copied().unwrap_or_default()
}

/// Returns true if `format` can be decoded.
pub fn is_type_supported(format: ImageFormat) -> bool {
    supported(format).load
}

/// Returns true if `format` can be encoded.
pub fn is_type_supported_save(format: ImageFormat) -> bool {
    supported(format).save
}

/// [`is_type_supported`] by format name.
pub fn is_type_name_supported(name: &str) -> bool {
    ImageFormat::from_name(name).is_some_and(is_type_supported)
}

/// [`is_type_supported_save`] by format name.
pub fn is_type_name_supported_save(name: &str) -> bool {
    ImageFormat::from_name(name).is_some_and(is_type_supported_save)
}

/// Returns true if `bytes` look like an SVG document.
pub fn is_svg(bytes: &[u8]) -> bool {
    static COMMENTS: OnceLock<Option<Regex>> = OnceLock::new();
    static SVG: OnceLock<Option<Regex>> = OnceLock::new();

    if is_binary(bytes) {
        return false;
    }
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    let comments = COMMENTS.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").ok());
    let svg = SVG.get_or_init(|| {
        Regex::new(r"(?is)^\s*(?:<\?xml[^>]*>\s*)?(?:<!doctype\s+svg[^>]*>\s*)?<svg[\s>/].*</svg>\s*$").ok()
    });
    let (Some(comments), Some(svg)) = (comments, svg) else {
        return false;
    };
    svg.is_match(&comments.replace_all(text, ""))
}

/// Control bytes other than whitespace in the first 24 bytes mark binary data.
fn is_binary(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .take(24)
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c))
}

/// Interpretation of the image encoded in `bytes`. Loads and releases it.
pub fn interpretation_of(runtime: &Runtime, bytes: &[u8]) -> Result<Interpretation> {
    let (handle, _) = ImageHandle::load(runtime, bytes)?;
    Ok(handle.interpretation())
}

/// Whether the colour space of the image in `bytes` can be converted.
pub fn colourspace_supported_of(runtime: &Runtime, bytes: &[u8]) -> Result<bool> {
    let (handle, _) = ImageHandle::load(runtime, bytes)?;
    Ok(handle.is_colourspace_supported())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_buffers_are_unknown() {
        assert_eq!(sniff(&[]), ImageFormat::Unknown);
        assert_eq!(sniff(&[0xff, 0xd8, 0xff]), ImageFormat::Unknown);
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n\0\0\0"), ImageFormat::Unknown);
    }

    #[test]
    fn magic_numbers() {
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n\0\0\0\x0d"), ImageFormat::Png);
        assert_eq!(sniff(b"\xff\xd8\xff\xe0\0\x10JFIF\0\x01"), ImageFormat::Jpeg);
        assert_eq!(sniff(b"RIFF\x24\0\0\0WEBPVP8L"), ImageFormat::Webp);
        assert_eq!(sniff(b"II*\0\x08\0\0\0\0\0\0\0"), ImageFormat::Tiff);
        assert_eq!(sniff(b"MM\0*\0\0\0\x08\0\0\0\0"), ImageFormat::Tiff);
        assert_eq!(sniff(b"hello, world!"), ImageFormat::Unknown);
    }

    #[cfg(feature = "generic")]
    #[test]
    fn gif_goes_to_generic_loader() {
        assert_eq!(sniff(b"GIF89a\x01\0\x01\0\0\0\0"), ImageFormat::GenericNative);
        assert_eq!(format_name(b"GIF89a\x01\0\x01\0\0\0\0"), "magick");
    }

    #[test]
    fn support_table() {
        assert_eq!(supported(ImageFormat::Png), SupportedFormat { load: true, save: true });
        assert_eq!(supported(ImageFormat::Tiff), SupportedFormat { load: true, save: false });
        assert_eq!(supported(ImageFormat::Gif), SupportedFormat::default());
        assert!(is_type_name_supported("jpeg"));
        assert!(is_type_name_supported_save("webp"));
        assert!(!is_type_name_supported_save("tiff"));
        assert!(!is_type_name_supported("pdf"));
        assert_eq!(is_type_supported(ImageFormat::GenericNative), cfg!(feature = "generic"));
    }

    #[test]
    fn svg_detection() {
        assert!(is_svg(b"<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>"));
        assert!(is_svg(
            b"<?xml version=\"1.0\"?>\n<!-- <b>drawn</b> -->\n<svg width=\"4\">\n<rect/>\n</svg>\n"
        ));
        assert!(is_svg(b"<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\">\n<svg></svg>"));
        assert!(!is_svg(b"<html><body></body></html>"));
        assert!(!is_svg(b"<svgfoo></svgfoo>"));
        assert!(!is_svg(b"\x89PNG\r\n\x1a\n<svg></svg>"));
    }
}
