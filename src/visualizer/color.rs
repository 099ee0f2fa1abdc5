// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use image::Rgb;

use crate::analyzer::{FrameStatus, PairVerdict};

/// Color type for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Red color.
    pub const RED: Self = Self(255, 0, 0);
    /// Green color.
    pub const GREEN: Self = Self(0, 255, 0);
    /// Orange color.
    pub const ORANGE: Self = Self(255, 165, 0);
    /// Yellow color.
    pub const YELLOW: Self = Self(255, 255, 0);
    /// White color.
    pub const WHITE: Self = Self(255, 255, 255);
    /// Black color.
    pub const BLACK: Self = Self(0, 0, 0);

    /// Create a new color from RGB values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Get a color from the pose palette by index.
    #[must_use]
    pub const fn from_pose_index(index: usize) -> Self {
        let color = POSE_COLORS[index % POSE_COLORS.len()];
        Self(color[0], color[1], color[2])
    }

    /// Banner color for a frame verdict.
    #[must_use]
    pub const fn for_status(status: FrameStatus) -> Self {
        match status {
            FrameStatus::Safe => Self::GREEN,
            FrameStatus::Violation => Self::RED,
        }
    }

    /// Line color for a flagged pair: red when the absolute rule fired,
    /// orange when only the relative rule did.
    #[must_use]
    pub const fn for_pair(pair: &PairVerdict) -> Self {
        if pair.abs_violation {
            Self::RED
        } else {
            Self::ORANGE
        }
    }
}

impl From<Color> for Rgb<u8> {
    fn from(c: Color) -> Self {
        Self([c.0, c.1, c.2])
    }
}

/// Ultralytics Pose Color Palette
pub const POSE_COLORS: [[u8; 3]; 20] = [
    [255, 128, 0],   // #ff8000
    [255, 153, 51],  // #ff9933
    [255, 178, 102], // #ffb266
    [230, 230, 0],   // #e6e600
    [255, 153, 255], // #ff99ff
    [153, 204, 255], // #99ccff
    [255, 102, 255], // #ff66ff
    [255, 51, 255],  // #ff33ff
    [102, 178, 255], // #66b2ff
    [51, 153, 255],  // #3399ff
    [255, 153, 153], // #ff9999
    [255, 102, 102], // #ff6666
    [255, 51, 51],   // #ff3333
    [153, 255, 153], // #99ff99
    [102, 255, 102], // #66ff66
    [51, 255, 51],   // #33ff33
    [0, 255, 0],     // #00ff00
    [0, 0, 255],     // #0000ff
    [255, 0, 0],     // #ff0000
    [255, 255, 255], // #ffffff
];
