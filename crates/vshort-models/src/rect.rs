use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Face bounding box in normalized frame coordinates (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceBox {
    /// Left edge (0.0 = left, 1.0 = right)
    pub x_min: f32,
    /// Top edge (0.0 = top, 1.0 = bottom)
    pub y_min: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    pub fn new(x_min: f32, y_min: f32, width: f32, height: f32) -> Self {
        Self {
            x_min,
            y_min,
            width,
            height,
        }
    }

    /// Horizontal center in normalized coordinates.
    pub fn center_x(&self) -> f32 {
        self.x_min + self.width / 2.0
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Clip the box to the unit square.
    pub fn clamped(&self) -> Self {
        let x_min = self.x_min.clamp(0.0, 1.0);
        let y_min = self.y_min.clamp(0.0, 1.0);
        Self {
            x_min,
            y_min,
            width: self.width.max(0.0).min(1.0 - x_min),
            height: self.height.max(0.0).min(1.0 - y_min),
        }
    }
}

/// Horizontal pixel range kept from a source frame.
///
/// Always satisfies `right = left + width` and `right <= source_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CropWindow {
    pub left: u32,
    pub right: u32,
}

impl CropWindow {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }
}
