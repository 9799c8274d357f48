//! Short-render pipeline and job control for vshort.
//!
//! This crate provides:
//! - The six-step pipeline from source video to captioned vertical short
//! - A single-flight job controller with pollable status and cancellation
//! - Structured job logging and per-job scratch directories

pub mod collaborators;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod workspace;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use collaborators::{CollaboratorFactory, Collaborators, DefaultCollaboratorFactory};
pub use config::{WorkerConfig, DEFAULT_OUTPUT_FILE};
pub use controller::JobController;
pub use error::{ControllerError, PipelineError, WorkerResult};
pub use logging::{init_tracing, JobLogger};
pub use pipeline::{JobRequest, PipelineOrchestrator, PipelineOutcome};
pub use progress::ProgressReporter;
pub use workspace::JobWorkspace;
