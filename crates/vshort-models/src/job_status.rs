//! Pollable job status snapshot.
//!
//! A single `JobStatus` value describes the whole controller at one instant.
//! Writers always replace the full value so readers never observe a
//! partially applied checkpoint.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{JobId, PipelineStep};

/// Lifecycle phase of the current (or last) job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// No job has been submitted yet
    #[default]
    Idle,
    Acquiring,
    Transcribing,
    Analyzing,
    Reframing,
    Captioning,
    Encoding,
    /// Output is ready for download
    Done,
    /// Job aborted with an error
    Failed,
    /// Job was cancelled by the caller
    Cancelled,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Idle => "idle",
            JobPhase::Acquiring => "acquiring",
            JobPhase::Transcribing => "transcribing",
            JobPhase::Analyzing => "analyzing",
            JobPhase::Reframing => "reframing",
            JobPhase::Captioning => "captioning",
            JobPhase::Encoding => "encoding",
            JobPhase::Done => "done",
            JobPhase::Failed => "failed",
            JobPhase::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Failed | JobPhase::Cancelled)
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time status of the job controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobStatus {
    /// Current or most recent job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Whether a pipeline is running right now
    pub is_processing: bool,
    /// Last checkpoint reached (0 = none)
    pub current_step: u8,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable status message
    pub message: String,
    pub phase: JobPhase,
    /// Failure description when `phase` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::idle()
    }
}

impl JobStatus {
    /// Status before any job has been submitted.
    pub fn idle() -> Self {
        Self {
            job_id: None,
            is_processing: false,
            current_step: 0,
            progress: 0,
            message: String::new(),
            phase: JobPhase::Idle,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Status right after a job was accepted.
    pub fn started(job_id: JobId) -> Self {
        Self {
            job_id: Some(job_id),
            is_processing: true,
            current_step: 0,
            progress: 0,
            message: "Starting...".to_string(),
            phase: JobPhase::Acquiring,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Apply a checkpoint. Returns `false` if it would move progress backwards.
    pub fn checkpoint(&mut self, step: PipelineStep) -> bool {
        if !self.is_processing || step.number() <= self.current_step {
            return false;
        }
        self.current_step = step.number();
        self.progress = step.progress();
        self.message = step.message().to_string();
        self.phase = step.phase();
        self.updated_at = Utc::now();
        true
    }

    /// Mark the job as finished with a downloadable output.
    pub fn complete(&mut self) {
        self.is_processing = false;
        self.progress = 100;
        self.message = "Done! Video ready.".to_string();
        self.phase = JobPhase::Done;
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// Mark the job as failed. The last reached checkpoint is kept.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.is_processing = false;
        self.message = format!("Error: {}", error);
        self.phase = JobPhase::Failed;
        self.error = Some(error);
        self.updated_at = Utc::now();
    }

    /// Mark the job as cancelled by the caller.
    pub fn cancel(&mut self) {
        self.is_processing = false;
        self.message = "Cancelled".to_string();
        self.phase = JobPhase::Cancelled;
        self.updated_at = Utc::now();
    }

    pub fn is_done(&self) -> bool {
        self.phase == JobPhase::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_status() {
        let status = JobStatus::idle();
        assert!(!status.is_processing);
        assert_eq!(status.current_step, 0);
        assert_eq!(status.phase, JobPhase::Idle);
    }

    #[test]
    fn test_checkpoints_are_monotonic() {
        let mut status = JobStatus::started(JobId::new());
        assert!(status.checkpoint(PipelineStep::Downloading));
        assert!(status.checkpoint(PipelineStep::Transcribing));
        assert!(!status.checkpoint(PipelineStep::Downloading));
        assert!(!status.checkpoint(PipelineStep::Transcribing));
        assert_eq!(status.current_step, 2);
        assert_eq!(status.progress, 33);
        assert_eq!(status.message, "Transcribing audio...");
        assert_eq!(status.phase, JobPhase::Transcribing);
    }

    #[test]
    fn test_fail_keeps_last_checkpoint() {
        let mut status = JobStatus::started(JobId::new());
        status.checkpoint(PipelineStep::Downloading);
        status.checkpoint(PipelineStep::Transcribing);
        status.checkpoint(PipelineStep::Analyzing);
        status.fail("ranking returned an empty window");

        assert!(!status.is_processing);
        assert_eq!(status.current_step, 3);
        assert_eq!(status.phase, JobPhase::Failed);
        assert_eq!(status.error.as_deref(), Some("ranking returned an empty window"));
        assert!(!status.checkpoint(PipelineStep::Reframing));
    }

    #[test]
    fn test_status_serializes_polling_fields() {
        let mut status = JobStatus::started(JobId::from_string("job-1"));
        status.checkpoint(PipelineStep::Downloading);
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["is_processing"], true);
        assert_eq!(json["current_step"], 1);
        assert_eq!(json["progress"], 17);
        assert_eq!(json["message"], "Downloading video...");
        assert_eq!(json["phase"], "acquiring");
        assert_eq!(json["job_id"], "job-1");
        assert!(json.get("error").is_none());
    }
}
