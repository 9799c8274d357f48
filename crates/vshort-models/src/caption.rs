//! Caption chunks and their on-screen style.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::encoding::{OUTPUT_HEIGHT, OUTPUT_WIDTH};

/// Default number of words shown at once.
pub const DEFAULT_CHUNK_SIZE: usize = 2;

/// A group of consecutive words shown together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionChunk {
    /// Space-joined word text
    pub text: String,
    /// Seconds from clip start when the chunk appears
    pub start: f64,
    /// Seconds from clip start when the chunk disappears
    pub end: f64,
    pub word_count: usize,
}

impl CaptionChunk {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Visual style for burned-in captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionStyle {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub font_size: u32,
    /// Fill color as `#RRGGBB`
    pub fill_color: String,
    pub stroke_color: String,
    /// Outline width in pixels
    pub stroke_width: u32,
    /// Point the text box is centered on
    pub anchor_x: u32,
    pub anchor_y: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            canvas_width: OUTPUT_WIDTH,
            canvas_height: OUTPUT_HEIGHT,
            font_size: 80,
            fill_color: "#FFD700".to_string(),
            stroke_color: "black".to_string(),
            stroke_width: 4,
            anchor_x: 540,
            anchor_y: 1500,
        }
    }
}
