//! Parameter objects for filters and encoding.

use serde::{Deserialize, Serialize};

use crate::color::{Color, Interpretation};
use crate::format::ImageFormat;

/// Encoder settings, fixed for one encode call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Lossy quality, 0..=100.
    pub quality: i32,
    /// Deflate effort for PNG, 0..=9.
    pub compression: i32,
    /// Target encoding. Anything but PNG or WEBP encodes as JPEG.
    pub format: ImageFormat,
    /// Progressive/interlaced output where the encoder supports it.
    pub interlace: bool,
    /// Drop any embedded colour profile before encoding.
    pub strip_profile: bool,
    /// Target colour interpretation, sRGB when unset.
    pub interpretation: Option<Interpretation>,
    /// Colour alpha is flattened onto, white when unset.
    pub background: Option<Color>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            compression: 6,
            format: ImageFormat::Jpeg,
            interlace: false,
            strip_profile: false,
            interpretation: None,
            background: None,
        }
    }
}

impl SaveOptions {
    /// Options for the given target format.
    pub fn new(format: ImageFormat) -> Self {
        Self { format, ..Default::default() }
    }

    /// Sets the quality.
    pub fn with_quality(mut self, quality: i32) -> Self {
        self.quality = quality;
        self
    }

    /// Sets the compression level.
    pub fn with_compression(mut self, compression: i32) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the interlace flag.
    pub fn with_interlace(mut self, interlace: bool) -> Self {
        self.interlace = interlace;
        self
    }

    /// Sets the strip-profile flag.
    pub fn with_strip_profile(mut self, strip: bool) -> Self {
        self.strip_profile = strip;
        self
    }

    /// Sets the target interpretation.
    pub fn with_interpretation(mut self, interpretation: Interpretation) -> Self {
        self.interpretation = Some(interpretation);
        self
    }

    /// Sets the flatten background.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = Some(background);
        self
    }

    /// Target interpretation with the sRGB default applied.
    pub fn target_interpretation(&self) -> Interpretation {
        self.interpretation.unwrap_or(Interpretation::Srgb)
    }

    /// Flatten background with the white default applied.
    pub fn flatten_background(&self) -> Color {
        self.background.unwrap_or(Color::WHITE)
    }
}

/// Gaussian blur parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianBlur {
    /// Standard deviation in pixels.
    pub sigma: f64,
    /// Kernel is truncated where it drops below this amplitude.
    pub min_ampl: f64,
}

impl Default for GaussianBlur {
    fn default() -> Self {
        Self { sigma: 1.0, min_ampl: 0.2 }
    }
}

/// Unsharp-mask parameters.
///
/// `x1` is the flat/jaggy threshold, `y2`/`y3` cap brightening and darkening,
/// `m1`/`m2` are the slopes for flat and jaggy areas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sharpen {
    /// Mask radius in pixels.
    pub radius: i32,
    /// Threshold between flat and jaggy.
    pub x1: f64,
    /// Maximum brightening.
    pub y2: f64,
    /// Maximum darkening.
    pub y3: f64,
    /// Slope for flat areas.
    pub m1: f64,
    /// Slope for jaggy areas.
    pub m2: f64,
}

impl Default for Sharpen {
    fn default() -> Self {
        Self {
            radius: 1,
            x1: 2.0,
            y2: 10.0,
            y3: 20.0,
            m1: 0.0,
            m2: 3.0,
        }
    }
}
