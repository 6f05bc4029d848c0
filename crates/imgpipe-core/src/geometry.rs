//! Geometry parameters for pipeline operations.

use serde::{Deserialize, Serialize};

/// Hard ceiling on any requested output width or height, in pixels.
pub const MAX_DIMENSION: i32 = 16383;

/// Rotation angles the engine supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Angle {
    /// No rotation.
    #[default]
    #[serde(rename = "0")]
    D0,
    /// 90 degrees clockwise.
    #[serde(rename = "90")]
    D90,
    /// 180 degrees.
    #[serde(rename = "180")]
    D180,
    /// 270 degrees clockwise.
    #[serde(rename = "270")]
    D270,
}

impl Angle {
    /// Maps a multiple of 90 degrees (any sign) onto a supported angle.
    ///
    /// Returns `None` for angles that are not multiples of 90.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(match degrees.rem_euclid(360) {
            0 => Angle::D0,
            90 => Angle::D90,
            180 => Angle::D180,
            _ => Angle::D270,
        })
    }

    /// Angle in degrees.
    pub fn degrees(&self) -> i32 {
        match self {
            Angle::D0 => 0,
            Angle::D90 => 90,
            Angle::D180 => 180,
            Angle::D270 => 270,
        }
    }
}

/// Mirroring axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Mirror left to right.
    Horizontal,
    /// Mirror top to bottom.
    Vertical,
}

/// How new canvas area is filled when an image is embedded in a larger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extend {
    /// Zero.
    Black,
    /// Replicate edge pixels.
    Copy,
    /// Tile the image.
    Repeat,
    /// Reflect the image about its edges.
    Mirror,
    /// Full-scale white.
    White,
    /// A caller-supplied colour.
    #[default]
    Background,
}

impl Extend {
    /// Maps a raw mode number (0..=5) onto an extend mode.
    ///
    /// Out-of-range values fall back to [`Extend::Background`].
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Extend::Black,
            1 => Extend::Copy,
            2 => Extend::Repeat,
            3 => Extend::Mirror,
            4 => Extend::White,
            _ => Extend::Background,
        }
    }

    /// Returns true if `raw` names a mode without falling back.
    pub fn is_valid_raw(raw: i32) -> bool {
        (0..=5).contains(&raw)
    }
}

/// Named resampling kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolator {
    /// Nearest neighbour.
    Nearest,
    /// Bilinear.
    Bilinear,
    /// Bicubic (Catmull-Rom).
    #[default]
    Bicubic,
    /// Locally bounded bicubic.
    Lbb,
    /// Edge-preserving, halo-free.
    Nohalo,
    /// Vertex-split quadratic B-spline.
    Vsqbs,
}

impl Interpolator {
    /// Engine name of the kernel.
    pub fn name(&self) -> &'static str {
        match self {
            Interpolator::Nearest => "nearest",
            Interpolator::Bilinear => "bilinear",
            Interpolator::Bicubic => "bicubic",
            Interpolator::Lbb => "lbb",
            Interpolator::Nohalo => "nohalo",
            Interpolator::Vsqbs => "vsqbs",
        }
    }
}

/// A rectangle in pixel coordinates.
///
/// `left`/`top` may be negative as requested by a caller; the crop operation
/// clamps them before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Area {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Area {
    /// Creates a new area.
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }

    /// Returns true if width or height is above [`MAX_DIMENSION`].
    pub fn exceeds_limit(&self) -> bool {
        self.width > MAX_DIMENSION || self.height > MAX_DIMENSION
    }

    /// Same area with a negative origin moved to zero.
    pub fn clamped(&self) -> Self {
        Self {
            left: self.left.max(0),
            top: self.top.max(0),
            ..*self
        }
    }
}
