//! Colour values and band interpretations.
//!
//! [`Interpretation`] says what the bands of an image mean; it decides the
//! native sample range, whether the last band is alpha, and whether the
//! engine can convert the image to another colour space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An RGB triple in 8-bit range, used for backgrounds and ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Color {
    /// Black.
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    /// White.
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };

    /// Creates a colour from its components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components as `f64`, in 8-bit range.
    pub fn to_array(self) -> [f64; 3] {
        [self.r as f64, self.g as f64, self.b as f64]
    }
}

/// Colour-space classification of an image's bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpretation {
    /// Bands with no particular meaning.
    #[default]
    Multiband,
    /// 8-bit greyscale, optional alpha.
    #[serde(rename = "b-w")]
    Bw,
    /// 16-bit greyscale, optional alpha.
    Grey16,
    /// 8-bit sRGB, optional alpha.
    Srgb,
    /// 16-bit sRGB, optional alpha.
    Rgb16,
    /// Linear float RGB in 0..1, optional alpha.
    Scrgb,
    /// 8-bit CMYK, optional alpha.
    Cmyk,
}

impl Interpretation {
    /// Short name, as the engine reports it.
    pub fn nick(&self) -> &'static str {
        match self {
            Interpretation::Multiband => "multiband",
            Interpretation::Bw => "b-w",
            Interpretation::Grey16 => "grey16",
            Interpretation::Srgb => "srgb",
            Interpretation::Rgb16 => "rgb16",
            Interpretation::Scrgb => "scrgb",
            Interpretation::Cmyk => "cmyk",
        }
    }

    /// Parses a short name.
    pub fn from_nick(nick: &str) -> Option<Self> {
        Some(match nick {
            "multiband" => Interpretation::Multiband,
            "b-w" => Interpretation::Bw,
            "grey16" => Interpretation::Grey16,
            "srgb" => Interpretation::Srgb,
            "rgb16" => Interpretation::Rgb16,
            "scrgb" => Interpretation::Scrgb,
            "cmyk" => Interpretation::Cmyk,
            _ => return None,
        })
    }

    /// Largest sample value for this interpretation.
    pub fn max_value(&self) -> f32 {
        match self {
            Interpretation::Grey16 | Interpretation::Rgb16 => 65535.0,
            Interpretation::Scrgb => 1.0,
            _ => 255.0,
        }
    }

    /// Number of colour bands, excluding alpha. `None` for [`Interpretation::Multiband`].
    pub fn colour_bands(&self) -> Option<u32> {
        match self {
            Interpretation::Multiband => None,
            Interpretation::Bw | Interpretation::Grey16 => Some(1),
            Interpretation::Srgb | Interpretation::Rgb16 | Interpretation::Scrgb => Some(3),
            Interpretation::Cmyk => Some(4),
        }
    }

    /// Whether an image with `bands` bands of this interpretation carries alpha.
    pub fn has_alpha(&self, bands: u32) -> bool {
        match self {
            Interpretation::Bw | Interpretation::Grey16 => bands == 2,
            Interpretation::Cmyk => bands == 5,
            _ => bands == 4,
        }
    }

    /// Whether the engine can convert images of this interpretation.
    pub fn is_convertible(&self) -> bool {
        !matches!(self, Interpretation::Multiband)
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_rules() {
        assert!(Interpretation::Srgb.has_alpha(4));
        assert!(!Interpretation::Srgb.has_alpha(3));
        assert!(Interpretation::Bw.has_alpha(2));
        assert!(!Interpretation::Cmyk.has_alpha(4));
        assert!(Interpretation::Cmyk.has_alpha(5));
        assert!(Interpretation::Multiband.has_alpha(4));
    }

    #[test]
    fn nick_round_trip() {
        for i in [
            Interpretation::Multiband,
            Interpretation::Bw,
            Interpretation::Grey16,
            Interpretation::Srgb,
            Interpretation::Rgb16,
            Interpretation::Scrgb,
            Interpretation::Cmyk,
        ] {
            assert_eq!(Interpretation::from_nick(i.nick()), Some(i));
        }
        assert_eq!(Interpretation::from_nick("lab"), None);
    }

    #[test]
    fn ranges() {
        assert_eq!(Interpretation::Srgb.max_value(), 255.0);
        assert_eq!(Interpretation::Rgb16.max_value(), 65535.0);
        assert_eq!(Interpretation::Scrgb.max_value(), 1.0);
        assert!(!Interpretation::Multiband.is_convertible());
    }
}
