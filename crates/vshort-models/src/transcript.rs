//! Transcript segments and word-level timing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::format_seconds;

/// One coarse segment returned by the transcription service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Full transcript of the source media.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Media duration in seconds as reported by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Transcript {
    pub fn new(segments: Vec<TranscriptSegment>) -> Self {
        Self {
            segments,
            language: None,
            duration: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }

    /// Segment texts joined by single spaces.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One line per segment, prefixed with its time range, e.g.
    /// `[00:00:10 - 00:00:14.500] text`.
    pub fn timestamped_text(&self) -> String {
        self.segments
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| {
                format!(
                    "[{} - {}] {}",
                    format_seconds(s.start),
                    format_seconds(s.end),
                    s.text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single display word with times relative to the clip start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl TimedWord {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transcript {
        Transcript::new(vec![
            TranscriptSegment::new(" Hello there ", 0.0, 2.0),
            TranscriptSegment::new("", 2.0, 2.5),
            TranscriptSegment::new("General Kenobi", 10.0, 14.5),
        ])
    }

    #[test]
    fn test_full_text_skips_blank_segments() {
        assert_eq!(sample().full_text(), "Hello there General Kenobi");
    }

    #[test]
    fn test_timestamped_text() {
        let text = sample().timestamped_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[00:00:00 - 00:00:02] Hello there");
        assert_eq!(lines[1], "[00:00:10 - 00:00:14.500] General Kenobi");
    }

    #[test]
    fn test_empty_transcript() {
        assert!(Transcript::default().is_empty());
        assert!(!sample().is_empty());
    }
}
