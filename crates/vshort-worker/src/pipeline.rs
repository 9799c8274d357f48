//! Sequential six-step short render.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn, Instrument};
use vshort_media::{
    chunk_words, expand_words, move_file, remove_if_exists, render_all, AudioTrack, EncodeJob,
    MediaError, ReframeRequest, ReframeStats,
};
use vshort_models::{JobId, PipelineStep, ViralSegment};

use crate::collaborators::Collaborators;
use crate::config::WorkerConfig;
use crate::error::{PipelineError, WorkerResult};
use crate::logging::JobLogger;
use crate::progress::ProgressReporter;
use crate::workspace::JobWorkspace;

/// A single accepted job.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: JobId,
    /// URL or local path of the source video
    pub locator: String,
}

/// What a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub output: PathBuf,
    pub segment: ViralSegment,
    pub reframe: ReframeStats,
    /// Number of caption overlays burned in (0 when captions were skipped)
    pub captions: usize,
}

/// Runs the pipeline for one job at a time.
pub struct PipelineOrchestrator {
    config: Arc<WorkerConfig>,
    collaborators: Collaborators,
}

impl PipelineOrchestrator {
    pub fn new(config: Arc<WorkerConfig>, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Run every step in order.
    ///
    /// The per-job working directory is removed on every exit path. On
    /// failure no file is left at the output path.
    pub async fn run(
        &self,
        request: &JobRequest,
        progress: &ProgressReporter,
        cancel: watch::Receiver<bool>,
    ) -> WorkerResult<PipelineOutcome> {
        let logger = JobLogger::new(&request.job_id, "short_render");
        let span = logger.create_span();
        self.run_inner(request, progress, cancel, &logger)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        request: &JobRequest,
        progress: &ProgressReporter,
        cancel: watch::Receiver<bool>,
        logger: &JobLogger,
    ) -> WorkerResult<PipelineOutcome> {
        let c = &self.collaborators;
        let output_path = self.config.output_path();
        logger.log_start(&request.locator);

        remove_if_exists(&output_path)
            .await
            .map_err(PipelineError::output)?;
        let workspace = JobWorkspace::create(&self.config.work_dir, &request.job_id)?;

        // 1. Acquire
        ensure_active(&cancel)?;
        progress.checkpoint(PipelineStep::Downloading);
        let started = Instant::now();
        let source = c
            .source
            .fetch(&request.locator, workspace.path())
            .await
            .map_err(|e| PipelineError::from_media(e, PipelineError::Acquisition))?;
        let info = c
            .prober
            .probe(&source)
            .await
            .map_err(|e| PipelineError::from_media(e, PipelineError::Acquisition))?;
        record_stage("acquisition", started);
        logger.log_progress(&format!(
            "Source is {}x{}, {:.1}s, audio: {}",
            info.width, info.height, info.duration, info.has_audio
        ));

        // 2. Transcribe
        ensure_active(&cancel)?;
        progress.checkpoint(PipelineStep::Transcribing);
        let started = Instant::now();
        let audio_path = workspace.audio_path();
        c.audio
            .extract(&source, &audio_path, cancel.clone())
            .await
            .map_err(|e| PipelineError::from_media(e, PipelineError::Transcription))?;
        let transcript = c
            .transcriber
            .transcribe(&audio_path)
            .await
            .map_err(|e| PipelineError::Transcription(e.to_string()))?;
        record_stage("transcription", started);

        // 3. Select the window
        ensure_active(&cancel)?;
        progress.checkpoint(PipelineStep::Analyzing);
        let started = Instant::now();
        let segment = c
            .ranker
            .select_segment(&transcript.timestamped_text())
            .await
            .map_err(|e| PipelineError::Ranking(e.to_string()))?;
        segment
            .validate(info.duration)
            .map_err(|e| PipelineError::Ranking(e.to_string()))?;
        record_stage("ranking", started);
        info!(
            start = segment.start,
            end = segment.end,
            reason = %segment.reason,
            "Viral segment selected"
        );

        // 4. Reframe
        ensure_active(&cancel)?;
        progress.checkpoint(PipelineStep::Reframing);
        let started = Instant::now();
        let reframe_request = ReframeRequest {
            source: source.clone(),
            start: segment.start,
            end: segment.end,
            source_width: info.width,
            source_height: info.height,
            output: workspace.reframed_path(),
        };
        let reframer = Arc::clone(&c.reframer);
        let reframe_cancel = cancel.clone();
        let stats = tokio::task::spawn_blocking(move || {
            reframer.reframe(&reframe_request, &reframe_cancel)
        })
        .await
        .map_err(|e| PipelineError::Reframing(format!("Reframe task panicked: {}", e)))?
        .map_err(|e| PipelineError::from_media(e, PipelineError::Reframing))?;
        record_stage("reframing", started);
        logger.log_progress(&format!(
            "Reframed {} frames ({} without a face)",
            stats.frames, stats.face_misses
        ));

        // 5. Captions (best effort)
        ensure_active(&cancel)?;
        progress.checkpoint(PipelineStep::Captioning);
        let started = Instant::now();
        let words = expand_words(&transcript.segments, segment.start, segment.end);
        let chunks = chunk_words(&words, self.config.caption_chunk_size);
        let overlays =
            match render_all(c.captions.as_ref(), &chunks, &workspace.captions_dir()).await {
                Ok(overlays) => overlays,
                Err(MediaError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(e) => {
                    let err = PipelineError::Caption(e.detail());
                    warn!(error = %err, "Continuing without captions");
                    logger.log_warning(&err.to_string());
                    Vec::new()
                }
            };
        record_stage("captioning", started);

        // 6. Encode and publish
        ensure_active(&cancel)?;
        progress.checkpoint(PipelineStep::Rendering);
        let started = Instant::now();
        let audio = info.has_audio.then(|| AudioTrack {
            source: source.clone(),
            start: segment.start,
            duration: segment.duration(),
        });
        let job = EncodeJob {
            video: workspace.reframed_path(),
            overlays,
            audio,
            output: workspace.render_path(),
        };
        c.encoder
            .encode(&job, cancel.clone())
            .await
            .map_err(|e| PipelineError::from_media(e, PipelineError::Encoding))?;
        ensure_active(&cancel)?;
        move_file(&job.output, &output_path)
            .await
            .map_err(PipelineError::output)?;
        record_stage("encoding", started);

        if let Err(e) = workspace.close() {
            warn!(error = %e, "Failed to remove job workspace");
        }

        let outcome = PipelineOutcome {
            output: output_path,
            segment,
            reframe: stats,
            captions: job.overlays.len(),
        };
        logger.log_completion(&format!("Short written to {}", outcome.output.display()));
        Ok(outcome)
    }
}

fn ensure_active(cancel: &watch::Receiver<bool>) -> WorkerResult<()> {
    if *cancel.borrow() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

fn record_stage(stage: &'static str, started: Instant) {
    histogram!("vshort_stage_duration_seconds", "stage" => stage)
        .record(started.elapsed().as_secs_f64());
}
