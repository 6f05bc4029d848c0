//! Encoded image formats.
//!
//! [`ImageFormat`] is decided once from the input bytes and never changes
//! for the lifetime of a pipeline run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoded image formats known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Unknown or unsupported format.
    #[default]
    Unknown,
    /// JPEG.
    Jpeg,
    /// WebP.
    Webp,
    /// PNG.
    Png,
    /// TIFF.
    Tiff,
    /// GIF.
    Gif,
    /// PDF.
    Pdf,
    /// SVG.
    Svg,
    /// Anything the engine's generic loader accepts.
    #[serde(rename = "magick")]
    GenericNative,
}

impl ImageFormat {
    /// Formats that carry a public name and may be queried for support.
    pub const NAMED: [ImageFormat; 5] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Webp,
        ImageFormat::Tiff,
        ImageFormat::GenericNative,
    ];

    /// Short name for the format, `"unknown"` for formats without one.
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::GenericNative => "magick",
            _ => "unknown",
        }
    }

    /// Looks a format up by its short name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED.into_iter().find(|f| f.name() == name)
    }

    /// Returns true if the format has a public name.
    pub fn is_named(&self) -> bool {
        Self::NAMED.contains(self)
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Pdf => "application/pdf",
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Unknown | ImageFormat::GenericNative => "application/octet-stream",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Load/save capability of one format in the current engine build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SupportedFormat {
    /// The engine can decode this format.
    pub load: bool,
    /// The engine can encode this format.
    pub save: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for f in ImageFormat::NAMED {
            assert_eq!(ImageFormat::from_name(f.name()), Some(f));
        }
        assert_eq!(ImageFormat::from_name("gif"), None);
        assert_eq!(ImageFormat::Gif.name(), "unknown");
        assert_eq!(ImageFormat::Unknown.to_string(), "unknown");
    }

    #[test]
    fn serde_uses_short_names() {
        let json = serde_json::to_string(&ImageFormat::GenericNative).unwrap();
        assert_eq!(json, "\"magick\"");
        let f: ImageFormat = serde_json::from_str("\"webp\"").unwrap();
        assert_eq!(f, ImageFormat::Webp);
    }
}
