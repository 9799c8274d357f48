//! Progress publication for the running job.

use std::sync::Arc;

use tokio::sync::watch;
use vshort_models::{JobId, JobStatus, PipelineStep};

use crate::logging::JobLogger;

/// Handle the pipeline uses to publish checkpoints.
///
/// Writes only land while the shared status still belongs to this job, and
/// each write replaces the whole snapshot.
#[derive(Clone)]
pub struct ProgressReporter {
    status: Arc<watch::Sender<JobStatus>>,
    job_id: JobId,
    logger: JobLogger,
}

impl ProgressReporter {
    pub fn new(status: Arc<watch::Sender<JobStatus>>, job_id: JobId) -> Self {
        let logger = JobLogger::new(&job_id, "short_render");
        Self {
            status,
            job_id,
            logger,
        }
    }

    /// Publish a checkpoint. Returns `false` if it was stale or for another job.
    pub fn checkpoint(&self, step: PipelineStep) -> bool {
        let applied = self.status.send_if_modified(|status| {
            status.job_id.as_ref() == Some(&self.job_id) && status.checkpoint(step)
        });
        if applied {
            self.logger.log_step(step);
        }
        applied
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }
}
