//! Rotation of raw digitizer axes into panel orientation.
//!
//! The pen digitizer is natively landscape (x runs along the long edge),
//! the touch digitizer natively portrait with y=0 at the bottom. Both are
//! rotated here so the core only ever sees panel-oriented coordinates.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::sensor::Extent;

/// Panel orientation relative to portrait (buttons at the bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    Portrait,
    /// 90° clockwise.
    LandscapeRight,
    /// 90° counter-clockwise.
    LandscapeLeft,
    /// 180°.
    Inverted,
}

impl Orientation {
    fn is_landscape(&self) -> bool {
        matches!(self, Orientation::LandscapeRight | Orientation::LandscapeLeft)
    }

    /// Rotate a touch coordinate. `max` is the raw maximum on each axis.
    pub fn rotate_touch(&self, x: u32, y: u32, max: Extent) -> (u32, u32) {
        let (x, y) = (x.min(max.width), y.min(max.height));
        match self {
            Orientation::Portrait => (x, max.height - y),
            Orientation::LandscapeRight => (y, x),
            Orientation::LandscapeLeft => (max.height - y, max.width - x),
            Orientation::Inverted => (max.width - x, y),
        }
    }

    /// Rotate a pen coordinate. `max` is the raw maximum on each axis.
    pub fn rotate_pen(&self, x: u32, y: u32, max: Extent) -> (u32, u32) {
        let (x, y) = (x.min(max.width), y.min(max.height));
        match self {
            Orientation::Portrait => (y, max.width - x),
            Orientation::LandscapeRight => (x, y),
            Orientation::LandscapeLeft => (max.width - x, max.height - y),
            Orientation::Inverted => (max.height - y, x),
        }
    }

    /// Touch extent after rotation.
    pub fn touch_extent(&self, max: Extent) -> Extent {
        if self.is_landscape() {
            Extent::new(max.height, max.width)
        } else {
            max
        }
    }

    /// Pen extent after rotation.
    pub fn pen_extent(&self, max: Extent) -> Extent {
        if self.is_landscape() {
            max
        } else {
            Extent::new(max.height, max.width)
        }
    }

    /// Panel extent for a portrait-specified display.
    pub fn display_extent(&self, portrait: Extent) -> Extent {
        if self.is_landscape() {
            Extent::new(portrait.height, portrait.width)
        } else {
            portrait
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::LandscapeRight => write!(f, "landscape-right"),
            Orientation::LandscapeLeft => write!(f, "landscape-left"),
            Orientation::Inverted => write!(f, "inverted"),
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape-right" | "landscaperight" | "landscape_right" => Ok(Orientation::LandscapeRight),
            "landscape-left" | "landscapeleft" | "landscape_left" => Ok(Orientation::LandscapeLeft),
            "inverted" => Ok(Orientation::Inverted),
            _ => Err(format!(
                "Invalid orientation '{}'. Valid values: portrait, landscape-right, landscape-left, inverted",
                s
            )),
        }
    }
}
