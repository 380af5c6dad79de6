//! Body colours and sanity colour grading.

use serde::Serialize;

/// Red, for slots `0, 3, 6, ...`.
pub const RED: u32 = 0x00ff_4444;
/// Green, for slots `1, 4, 7, ...`.
pub const GREEN: u32 = 0x0044_ff44;
/// Blue, for slots `2, 5, 8, ...`.
pub const BLUE: u32 = 0x0044_44ff;

/// Colour for the body in `slot`, cycling red, green, blue.
pub const fn body_color(slot: usize) -> u32 {
    match slot % 3 {
        0 => RED,
        1 => GREEN,
        _ => BLUE,
    }
}

/// Linear RGB triple in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgb {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
}

/// Coarse reading of the sanity index used for scene grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SanityBand {
    /// Sanity above 70.
    Order,
    /// Sanity above 30, up to 70.
    Transition,
    /// Sanity 30 or below.
    Chaos,
}

impl SanityBand {
    /// Band for a sanity value.
    pub fn from_sanity(sanity: f64) -> Self {
        if sanity > 70.0 {
            Self::Order
        } else if sanity > 30.0 {
            Self::Transition
        } else {
            Self::Chaos
        }
    }

    /// Scene tint for this band.
    pub const fn grade(self) -> Rgb {
        match self {
            Self::Order => Rgb { r: 0.2, g: 0.8, b: 0.6 },
            Self::Transition => Rgb { r: 0.8, g: 0.6, b: 0.2 },
            Self::Chaos => Rgb { r: 0.8, g: 0.2, b: 0.2 },
        }
    }
}
