//! The viral segment chosen by the ranking service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timestamp::deserialize_seconds;

/// Structural problems with a ranked window.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    #[error("segment bounds must be finite numbers")]
    NotFinite,
    #[error("segment start {start:.2}s must be before end {end:.2}s")]
    Empty { start: f64, end: f64 },
    #[error("segment {start:.2}s-{end:.2}s is outside the source (0-{duration:.2}s)")]
    OutOfBounds { start: f64, end: f64, duration: f64 },
}

/// Time window of the source selected for the short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViralSegment {
    /// Start time in seconds
    #[serde(deserialize_with = "deserialize_seconds")]
    pub start: f64,
    /// End time in seconds
    #[serde(deserialize_with = "deserialize_seconds")]
    pub end: f64,
    /// Why this window was chosen
    #[serde(default)]
    pub reason: String,
}

impl ViralSegment {
    pub fn new(start: f64, end: f64, reason: impl Into<String>) -> Self {
        Self {
            start,
            end,
            reason: reason.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check `0 <= start < end <= source_duration`.
    pub fn validate(&self, source_duration: f64) -> Result<(), SegmentError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(SegmentError::NotFinite);
        }
        if self.start >= self.end {
            return Err(SegmentError::Empty {
                start: self.start,
                end: self.end,
            });
        }
        if self.start < 0.0 || self.end > source_duration {
            return Err(SegmentError::OutOfBounds {
                start: self.start,
                end: self.end,
                duration: source_duration,
            });
        }
        Ok(())
    }
}
