//! Single-flight job controller.
//!
//! At most one pipeline runs at a time. The controller owns the shared
//! [`JobStatus`] and is the only place that starts or finishes jobs.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use metrics::counter;
use tokio::sync::watch;
use tracing::{info, warn};
use vshort_models::{JobId, JobStatus};

use crate::collaborators::CollaboratorFactory;
use crate::config::WorkerConfig;
use crate::error::{ControllerError, PipelineError, WorkerResult};
use crate::logging::JobLogger;
use crate::pipeline::{JobRequest, PipelineOrchestrator, PipelineOutcome};
use crate::progress::ProgressReporter;

struct Inner {
    config: Arc<WorkerConfig>,
    factory: Arc<dyn CollaboratorFactory>,
    status: Arc<watch::Sender<JobStatus>>,
    cancel: Mutex<Option<watch::Sender<bool>>>,
}

/// Cheaply cloneable handle shared by the CLI and HTTP handlers.
#[derive(Clone)]
pub struct JobController {
    inner: Arc<Inner>,
}

impl JobController {
    pub fn new(config: Arc<WorkerConfig>, factory: Arc<dyn CollaboratorFactory>) -> Self {
        let (status, _) = watch::channel(JobStatus::idle());
        Self {
            inner: Arc::new(Inner {
                config,
                factory,
                status: Arc::new(status),
                cancel: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    /// Accept a job and start it in the background.
    ///
    /// Fails with `Conflict` while another job is processing.
    pub fn submit(&self, locator: &str, api_key: &str) -> Result<JobId, ControllerError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(ControllerError::InvalidRequest("Missing URL".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(ControllerError::InvalidRequest(
                "Missing API key".to_string(),
            ));
        }
        if self.inner.status.borrow().is_processing {
            return Err(ControllerError::Conflict);
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let collaborators = self
            .inner
            .factory
            .build(api_key, &cancel_rx)
            .map_err(|e| ControllerError::InvalidRequest(e.to_string()))?;

        // Claim the slot; a concurrent submit may have won since the check above.
        let job_id = JobId::new();
        let claimed = self.inner.status.send_if_modified(|status| {
            if status.is_processing {
                return false;
            }
            *status = JobStatus::started(job_id.clone());
            true
        });
        if !claimed {
            return Err(ControllerError::Conflict);
        }

        *self.lock_cancel() = Some(cancel_tx);
        counter!("vshort_jobs_submitted_total").increment(1);

        let request = JobRequest {
            job_id: job_id.clone(),
            locator: locator.to_string(),
        };
        let orchestrator = PipelineOrchestrator::new(Arc::clone(&self.inner.config), collaborators);
        let controller = self.clone();

        tokio::spawn(async move {
            let job_id = request.job_id.clone();
            // Release the slot even if the pipeline panics.
            let guard_controller = controller.clone();
            let guard_job = job_id.clone();
            let _guard = scopeguard::guard((), move |_| {
                guard_controller.fail_if_processing(&guard_job, "Pipeline aborted unexpectedly");
            });

            let progress = ProgressReporter::new(Arc::clone(&controller.inner.status), job_id);
            let result = orchestrator.run(&request, &progress, cancel_rx).await;
            controller.finish(&request.job_id, result);
        });

        Ok(job_id)
    }

    /// Current status snapshot.
    pub fn status(&self) -> JobStatus {
        self.inner.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.inner.status.subscribe()
    }

    /// Path of the finished short, if the last job completed.
    pub fn fetch_output(&self) -> Result<PathBuf, ControllerError> {
        let path = self.inner.config.output_path();
        if self.inner.status.borrow().is_done() && path.is_file() {
            Ok(path)
        } else {
            Err(ControllerError::NotFound("Video not found".to_string()))
        }
    }

    /// Ask the running job to stop at its next cancellation point.
    pub fn cancel(&self) -> Result<JobId, ControllerError> {
        let status = self.status();
        let job_id = match status.job_id {
            Some(job_id) if status.is_processing => job_id,
            _ => {
                return Err(ControllerError::NotFound(
                    "No job is being processed".to_string(),
                ))
            }
        };

        if let Some(cancel) = self.lock_cancel().as_ref() {
            // Receivers may already be gone if the job is finishing.
            let _ = cancel.send(true);
        }
        info!(job_id = %job_id, "Cancellation requested");
        Ok(job_id)
    }

    /// Resolve once no job is processing.
    pub async fn wait_until_idle(&self) -> JobStatus {
        let mut rx = self.subscribe();
        let status = match rx.wait_for(|status| !status.is_processing).await {
            Ok(status) => status.clone(),
            Err(_) => self.status(),
        };
        status
    }

    fn finish(&self, job_id: &JobId, result: WorkerResult<PipelineOutcome>) {
        let logger = JobLogger::new(job_id, "short_render");
        let updated = self.inner.status.send_if_modified(|status| {
            if status.job_id.as_ref() != Some(job_id) || !status.is_processing {
                return false;
            }
            *self.lock_cancel() = None;
            match &result {
                Ok(_) => status.complete(),
                Err(PipelineError::Cancelled) => status.cancel(),
                Err(e) => status.fail(e.to_string()),
            }
            true
        });

        if !updated {
            return;
        }
        match result {
            Ok(outcome) => {
                counter!("vshort_jobs_completed_total").increment(1);
                logger.log_completion(&format!(
                    "{} frames, {} captions",
                    outcome.reframe.frames, outcome.captions
                ));
            }
            Err(PipelineError::Cancelled) => {
                counter!("vshort_jobs_cancelled_total").increment(1);
                logger.log_warning("Cancelled");
            }
            Err(e) => {
                counter!("vshort_jobs_failed_total", "stage" => e.stage()).increment(1);
                logger.log_error(&e.to_string());
            }
        }
    }

    fn fail_if_processing(&self, job_id: &JobId, reason: &str) {
        let updated = self.inner.status.send_if_modified(|status| {
            if status.job_id.as_ref() == Some(job_id) && status.is_processing {
                *self.lock_cancel() = None;
                status.fail(reason);
                true
            } else {
                false
            }
        });
        if updated {
            warn!(job_id = %job_id, reason, "Job released by guard");
        }
    }

    fn lock_cancel(&self) -> std::sync::MutexGuard<'_, Option<watch::Sender<bool>>> {
        self.inner
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::sync::Semaphore;
    use vshort_models::{JobPhase, Transcript};

    use super::*;
    use crate::testing::{FakeServices, FAKE_OUTPUT};

    fn controller(services: &FakeServices, dir: &TempDir) -> JobController {
        let config = WorkerConfig {
            work_dir: dir.path().join("work"),
            output_dir: dir.path().join("out"),
            ..WorkerConfig::default()
        };
        JobController::new(Arc::new(config), Arc::new(services.factory()))
    }

    fn workspace_is_empty(dir: &TempDir) -> bool {
        match std::fs::read_dir(dir.path().join("work")) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_success() {
        let dir = TempDir::new().unwrap();
        let services = FakeServices::default();
        let controller = controller(&services, &dir);
        services.log.attach(controller.subscribe());

        controller.submit("https://youtu.be/abc", "gsk_test").unwrap();
        let status = controller.wait_until_idle().await;

        assert_eq!(status.phase, JobPhase::Done);
        assert_eq!(status.progress, 100);
        assert_eq!(status.message, "Done! Video ready.");

        let output = controller.fetch_output().unwrap();
        assert_eq!(std::fs::read(output).unwrap(), FAKE_OUTPUT);
        assert!(workspace_is_empty(&dir));

        // Only "this is the part that matters" lies inside 10-70s: 6 words, 3 caption chunks.
        assert_eq!(
            services.log.entries(),
            vec![
                ("fetch", 1),
                ("probe", 1),
                ("audio", 2),
                ("transcribe", 2),
                ("rank", 3),
                ("reframe", 4),
                ("caption", 5),
                ("caption", 5),
                ("caption", 5),
                ("encode", 6),
            ]
        );

        let encode = services.last_encode().unwrap();
        assert_eq!(encode.overlays.len(), 3);
        let audio = encode.audio.unwrap();
        assert_eq!(audio.start, 10.0);
        assert_eq!(audio.duration, 60.0);
    }

    #[tokio::test]
    async fn test_reversed_segment_fails_without_output() {
        let dir = TempDir::new().unwrap();
        let services = FakeServices::default().with_segment(70.0, 10.0);
        let controller = controller(&services, &dir);

        controller.submit("https://youtu.be/abc", "gsk_test").unwrap();
        let status = controller.wait_until_idle().await;

        assert_eq!(status.phase, JobPhase::Failed);
        assert_eq!(status.current_step, 3);
        assert!(status.message.starts_with("Error: Segment ranking failed"));
        assert!(!services.log.names().contains(&"reframe"));
        assert!(!dir.path().join("out/final_viral_short.mp4").exists());
        assert_eq!(
            controller.fetch_output(),
            Err(ControllerError::NotFound("Video not found".to_string()))
        );
        assert!(workspace_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_silent_transcript_fails_at_ranking() {
        let dir = TempDir::new().unwrap();
        let services = FakeServices::default().with_transcript(Transcript::new(Vec::new()));
        let controller = controller(&services, &dir);
        services.log.attach(controller.subscribe());

        controller.submit("https://youtu.be/quiet", "gsk_test").unwrap();
        let status = controller.wait_until_idle().await;

        assert_eq!(status.phase, JobPhase::Failed);
        assert_eq!(status.current_step, 3);
        assert!(status.message.starts_with("Error: Segment ranking failed"));
        assert_eq!(services.log.entries().last(), Some(&("rank", 3)));
        assert!(workspace_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_download_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let services = FakeServices::default().with_download_error("Video unavailable");
        let controller = controller(&services, &dir);

        controller.submit("https://youtu.be/gone", "gsk_test").unwrap();
        let status = controller.wait_until_idle().await;

        assert_eq!(status.phase, JobPhase::Failed);
        assert_eq!(status.current_step, 1);
        assert_eq!(
            status.error.as_deref(),
            Some("Acquisition failed: Download failed: Video unavailable")
        );
    }

    #[tokio::test]
    async fn test_second_submit_conflicts_until_done() {
        let dir = TempDir::new().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let services = FakeServices::default().with_ranker_gate(Arc::clone(&gate));
        let controller = controller(&services, &dir);

        let first = controller.submit("https://youtu.be/one", "gsk_test").unwrap();
        assert_eq!(
            controller.submit("https://youtu.be/two", "gsk_test"),
            Err(ControllerError::Conflict)
        );
        assert_eq!(controller.status().job_id, Some(first));
        assert!(controller.fetch_output().is_err());

        gate.add_permits(1);
        assert_eq!(controller.wait_until_idle().await.phase, JobPhase::Done);

        gate.add_permits(1);
        let second = controller.submit("https://youtu.be/two", "gsk_test").unwrap();
        let status = controller.wait_until_idle().await;
        assert_eq!(status.job_id, Some(second));
        assert_eq!(status.phase, JobPhase::Done);
    }

    #[tokio::test]
    async fn test_cancel_running_job() {
        let dir = TempDir::new().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let services = FakeServices::default().with_ranker_gate(Arc::clone(&gate));
        let controller = controller(&services, &dir);

        let job_id = controller.submit("https://youtu.be/abc", "gsk_test").unwrap();
        let mut rx = controller.subscribe();
        rx.wait_for(|s| s.current_step == 3).await.unwrap();

        assert_eq!(controller.cancel(), Ok(job_id));
        gate.add_permits(1);

        let status = tokio::time::timeout(Duration::from_secs(5), controller.wait_until_idle())
            .await
            .unwrap();
        assert_eq!(status.phase, JobPhase::Cancelled);
        assert_eq!(status.message, "Cancelled");
        assert!(!services.log.names().contains(&"reframe"));
        assert!(controller.fetch_output().is_err());
        assert!(workspace_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_cancel_without_job() {
        let dir = TempDir::new().unwrap();
        let controller = controller(&FakeServices::default(), &dir);
        assert!(matches!(controller.cancel(), Err(ControllerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_caption_failure_still_renders() {
        let dir = TempDir::new().unwrap();
        let services = FakeServices::default().with_failing_captions();
        let controller = controller(&services, &dir);

        controller.submit("https://youtu.be/abc", "gsk_test").unwrap();
        let status = controller.wait_until_idle().await;

        assert_eq!(status.phase, JobPhase::Done);
        assert!(services.last_encode().unwrap().overlays.is_empty());
        assert!(controller.fetch_output().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let dir = TempDir::new().unwrap();
        let controller = controller(&FakeServices::default(), &dir);

        assert_eq!(
            controller.submit("  ", "gsk_test"),
            Err(ControllerError::InvalidRequest("Missing URL".to_string()))
        );
        assert_eq!(
            controller.submit("https://youtu.be/abc", ""),
            Err(ControllerError::InvalidRequest("Missing API key".to_string()))
        );
        assert!(matches!(
            controller.submit("https://youtu.be/abc", "invalid"),
            Err(ControllerError::InvalidRequest(_))
        ));
        assert!(!controller.status().is_processing);
    }
}
