use crate::provider::VisionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fractional face rectangle, relative to the image width and height.
///
/// The provider keeps these within [0, 1]; they are not validated here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Convert to absolute pixel coordinates, flooring each component.
    ///
    /// A box with any non-finite component maps to an empty rectangle.
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> PixelRect {
        if ![self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
        {
            return PixelRect { x: 0, y: 0, width: 0, height: 0 };
        }
        PixelRect {
            x: scale(self.left, image_width),
            y: scale(self.top, image_height),
            width: scale(self.width, image_width),
            height: scale(self.height, image_height),
        }
    }
}

/// `as` saturates, so slightly negative fractions land on 0.
fn scale(fraction: f32, extent: u32) -> u32 {
    (f64::from(fraction) * f64::from(extent)).floor() as u32
}

/// Absolute pixel rectangle inside a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Shrink the rectangle so it lies entirely within the image.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> PixelRect {
        let x = self.x.min(image_width);
        let y = self.y.min(image_height);
        PixelRect {
            x,
            y,
            width: self.width.min(image_width - x),
            height: self.height.min(image_height - y),
        }
    }
}

/// Estimated age range in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub low: u32,
    pub high: u32,
}

/// One emotion label (e.g. "HAPPY") with the provider's confidence percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub label: String,
    pub confidence: f32,
}

/// A face reported by the vision provider. Emotions keep provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetail {
    pub age_range: AgeRange,
    pub emotions: Vec<Emotion>,
    pub bounding_box: BoundingBox,
}

/// A target face whose similarity met the requested threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    /// Similarity percentage in [0, 100].
    pub similarity: f32,
    pub bounding_box: BoundingBox,
}

/// Minimum similarity percentage, within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Threshold(u8);

impl Threshold {
    pub const MAX: u8 = 100;
    pub const DEFAULT: Threshold = Threshold(80);

    pub fn new(value: u8) -> Result<Self, VisionError> {
        if value > Self::MAX {
            return Err(VisionError::InvalidArgument(format!(
                "threshold must be within 0..={}, got {value}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn as_percent(self) -> f32 {
        f32::from(self.0)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for Threshold {
    type Error = VisionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for u8 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

impl FromStr for Threshold {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| VisionError::InvalidArgument(format!("threshold is not an integer: {s:?}")))?;
        Self::new(value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
