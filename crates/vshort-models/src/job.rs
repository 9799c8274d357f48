//! Job identity and the six pipeline checkpoints.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::job_status::JobPhase;

/// Number of progress checkpoints in a single run.
pub const TOTAL_STEPS: u8 = 6;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A progress checkpoint reported by the pipeline.
///
/// Checkpoints are reported strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Downloading,
    Transcribing,
    Analyzing,
    Reframing,
    Captioning,
    Rendering,
}

impl PipelineStep {
    /// All checkpoints in execution order.
    pub const ALL: [PipelineStep; TOTAL_STEPS as usize] = [
        PipelineStep::Downloading,
        PipelineStep::Transcribing,
        PipelineStep::Analyzing,
        PipelineStep::Reframing,
        PipelineStep::Captioning,
        PipelineStep::Rendering,
    ];

    /// 1-based checkpoint number.
    pub fn number(&self) -> u8 {
        match self {
            PipelineStep::Downloading => 1,
            PipelineStep::Transcribing => 2,
            PipelineStep::Analyzing => 3,
            PipelineStep::Reframing => 4,
            PipelineStep::Captioning => 5,
            PipelineStep::Rendering => 6,
        }
    }

    /// Human-readable status message shown while this step runs.
    pub fn message(&self) -> &'static str {
        match self {
            PipelineStep::Downloading => "Downloading video...",
            PipelineStep::Transcribing => "Transcribing audio...",
            PipelineStep::Analyzing => "Analyzing viral segment...",
            PipelineStep::Reframing => "Tracking faces and reframing...",
            PipelineStep::Captioning => "Generating captions...",
            PipelineStep::Rendering => "Rendering final video...",
        }
    }

    /// Phase the job is in while this step runs.
    pub fn phase(&self) -> JobPhase {
        match self {
            PipelineStep::Downloading => JobPhase::Acquiring,
            PipelineStep::Transcribing => JobPhase::Transcribing,
            PipelineStep::Analyzing => JobPhase::Analyzing,
            PipelineStep::Reframing => JobPhase::Reframing,
            PipelineStep::Captioning => JobPhase::Captioning,
            PipelineStep::Rendering => JobPhase::Encoding,
        }
    }

    /// Progress percentage reported when this checkpoint is reached.
    pub fn progress(&self) -> u8 {
        progress_for_step(self.number())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Downloading => "downloading",
            PipelineStep::Transcribing => "transcribing",
            PipelineStep::Analyzing => "analyzing",
            PipelineStep::Reframing => "reframing",
            PipelineStep::Captioning => "captioning",
            PipelineStep::Rendering => "rendering",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `round(step / 6 * 100)`, saturating at 100.
pub fn progress_for_step(step: u8) -> u8 {
    let step = step.min(TOTAL_STEPS);
    ((step as f64 / TOTAL_STEPS as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_is_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_progress_for_each_step() {
        let progress: Vec<u8> = PipelineStep::ALL.iter().map(|s| s.progress()).collect();
        assert_eq!(progress, vec![17, 33, 50, 67, 83, 100]);
        assert_eq!(progress_for_step(0), 0);
        assert_eq!(progress_for_step(9), 100);
    }

    #[test]
    fn test_steps_are_ordered() {
        let numbers: Vec<u8> = PipelineStep::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        assert!(PipelineStep::Downloading < PipelineStep::Rendering);
    }
}
