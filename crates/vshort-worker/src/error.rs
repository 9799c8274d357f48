//! Worker error types.

use thiserror::Error;
use vshort_media::MediaError;

pub type WorkerResult<T> = Result<T, PipelineError>;

/// Why a pipeline run stopped.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Acquisition failed: {0}")]
    Acquisition(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Segment ranking failed: {0}")]
    Ranking(String),

    #[error("Reframing failed: {0}")]
    Reframing(String),

    /// Never fatal; the render continues without captions.
    #[error("Caption rendering failed: {0}")]
    Caption(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Wrap a media error for the given stage, keeping cancellation distinct.
    pub fn from_media(err: MediaError, stage: fn(String) -> Self) -> Self {
        match err {
            MediaError::Cancelled => Self::Cancelled,
            other => stage(other.detail()),
        }
    }

    /// Errors while touching the published output file.
    pub fn output(err: MediaError) -> Self {
        match err {
            MediaError::Io(e) => Self::Io(e),
            other => Self::Encoding(other.detail()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// Short stage label for metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Acquisition(_) => "acquisition",
            PipelineError::Transcription(_) => "transcription",
            PipelineError::Ranking(_) => "ranking",
            PipelineError::Reframing(_) => "reframing",
            PipelineError::Caption(_) => "caption",
            PipelineError::Encoding(_) => "encoding",
            PipelineError::Cancelled => "cancelled",
            PipelineError::Io(_) => "io",
            PipelineError::Config(_) => "config",
        }
    }
}

/// Rejections from the job controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("A video is already being processed")]
    Conflict,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),
}
