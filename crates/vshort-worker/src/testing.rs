//! In-memory collaborators for exercising the pipeline without FFmpeg or Groq.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};
use vshort_media::{
    AudioExtractor, CaptionOverlay, CaptionRenderer, ClipReframer, EncodeJob, MediaEncoder,
    MediaError, MediaProber, MediaResult, ReframeRequest, ReframeStats, VideoInfo, VideoSource,
};
use vshort_ml_client::{MlError, MlResult, SegmentRanker, Transcriber};
use vshort_models::{CaptionChunk, JobStatus, Transcript, TranscriptSegment, ViralSegment};

use crate::collaborators::{CollaboratorFactory, Collaborators};
use crate::error::PipelineError;

/// Bytes the fake encoder writes as the rendered short.
pub const FAKE_OUTPUT: &[u8] = b"fake mp4 payload";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Records which collaborator ran and the checkpoint visible at that moment.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<(&'static str, u8)>>>,
    status: Arc<Mutex<Option<watch::Receiver<JobStatus>>>>,
}

impl CallLog {
    /// Observe checkpoints through this receiver from now on.
    pub fn attach(&self, status: watch::Receiver<JobStatus>) {
        *lock(&self.status) = Some(status);
    }

    fn record(&self, name: &'static str) {
        let step = lock(&self.status)
            .as_ref()
            .map(|rx| rx.borrow().current_step)
            .unwrap_or(0);
        lock(&self.entries).push((name, step));
    }

    pub fn entries(&self) -> Vec<(&'static str, u8)> {
        lock(&self.entries).clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries().into_iter().map(|(name, _)| name).collect()
    }
}

/// Knobs for the fake collaborators.
#[derive(Clone)]
pub struct FakeServices {
    pub log: CallLog,
    pub source_duration: f64,
    pub has_audio: bool,
    pub download_error: Option<String>,
    pub transcript: Transcript,
    pub segment: ViralSegment,
    /// When set, ranking waits for a permit
    pub ranker_gate: Option<Arc<Semaphore>>,
    pub fail_captions: bool,
    pub last_encode: Arc<Mutex<Option<EncodeJob>>>,
}

impl Default for FakeServices {
    fn default() -> Self {
        Self {
            log: CallLog::default(),
            source_duration: 90.0,
            has_audio: true,
            download_error: None,
            transcript: Transcript::new(vec![
                TranscriptSegment::new("welcome back everyone", 2.0, 9.0),
                TranscriptSegment::new("this is the part that matters", 12.0, 18.0),
                TranscriptSegment::new("thanks for watching", 80.0, 86.0),
            ]),
            segment: ViralSegment::new(10.0, 70.0, "strong hook"),
            ranker_gate: None,
            fail_captions: false,
            last_encode: Arc::new(Mutex::new(None)),
        }
    }
}

impl FakeServices {
    pub fn with_segment(mut self, start: f64, end: f64) -> Self {
        self.segment = ViralSegment::new(start, end, "test");
        self
    }

    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn with_ranker_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.ranker_gate = Some(gate);
        self
    }

    pub fn with_failing_captions(mut self) -> Self {
        self.fail_captions = true;
        self
    }

    pub fn with_download_error(mut self, message: impl Into<String>) -> Self {
        self.download_error = Some(message.into());
        self
    }

    pub fn last_encode(&self) -> Option<EncodeJob> {
        lock(&self.last_encode).clone()
    }

    pub fn collaborators(&self) -> Collaborators {
        let fake = Arc::new(self.clone());
        Collaborators {
            source: fake.clone(),
            prober: fake.clone(),
            audio: fake.clone(),
            transcriber: fake.clone(),
            ranker: fake.clone(),
            reframer: fake.clone(),
            captions: fake.clone(),
            encoder: fake,
        }
    }

    pub fn factory(&self) -> FakeFactory {
        FakeFactory {
            services: self.clone(),
        }
    }
}

#[async_trait]
impl VideoSource for FakeServices {
    async fn fetch(&self, _locator: &str, dest_dir: &Path) -> MediaResult<PathBuf> {
        self.log.record("fetch");
        if let Some(message) = &self.download_error {
            return Err(MediaError::download_failed(message.clone()));
        }
        let path = dest_dir.join("input.mp4");
        tokio::fs::write(&path, b"source").await?;
        Ok(path)
    }
}

#[async_trait]
impl MediaProber for FakeServices {
    async fn probe(&self, _path: &Path) -> MediaResult<VideoInfo> {
        self.log.record("probe");
        Ok(VideoInfo {
            duration: self.source_duration,
            width: 1920,
            height: 1080,
            fps: 30.0,
            codec: "h264".to_string(),
            has_audio: self.has_audio,
            size: 6,
        })
    }
}

#[async_trait]
impl AudioExtractor for FakeServices {
    async fn extract(
        &self,
        _video: &Path,
        dest: &Path,
        _cancel: watch::Receiver<bool>,
    ) -> MediaResult<()> {
        self.log.record("audio");
        tokio::fs::write(dest, b"audio").await?;
        Ok(())
    }
}

#[async_trait]
impl Transcriber for FakeServices {
    async fn transcribe(&self, _media: &Path) -> MlResult<Transcript> {
        self.log.record("transcribe");
        Ok(self.transcript.clone())
    }
}

#[async_trait]
impl SegmentRanker for FakeServices {
    async fn select_segment(&self, transcript_text: &str) -> MlResult<ViralSegment> {
        self.log.record("rank");
        if transcript_text.is_empty() {
            return Err(MlError::InvalidInput("empty transcript".to_string()));
        }
        if let Some(gate) = &self.ranker_gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| MlError::RequestFailed(e.to_string()))?;
        }
        Ok(self.segment.clone())
    }
}

impl ClipReframer for FakeServices {
    fn reframe(
        &self,
        request: &ReframeRequest,
        cancel: &watch::Receiver<bool>,
    ) -> MediaResult<ReframeStats> {
        self.log.record("reframe");
        if *cancel.borrow() {
            return Err(MediaError::Cancelled);
        }
        std::fs::write(&request.output, b"reframed")?;
        Ok(ReframeStats {
            frames: (request.duration() * 30.0) as u64,
            face_misses: 0,
            crop_width: 607,
        })
    }
}

#[async_trait]
impl CaptionRenderer for FakeServices {
    async fn render(
        &self,
        chunk: &CaptionChunk,
        index: usize,
        out_dir: &Path,
    ) -> MediaResult<CaptionOverlay> {
        self.log.record("caption");
        if self.fail_captions {
            return Err(MediaError::FontUnavailable(PathBuf::from("missing.ttf")));
        }
        let path = out_dir.join(format!("caption_{:04}.png", index));
        tokio::fs::write(&path, chunk.text.as_bytes()).await?;
        Ok(CaptionOverlay {
            path,
            start: chunk.start,
            end: chunk.end,
        })
    }
}

#[async_trait]
impl MediaEncoder for FakeServices {
    async fn encode(&self, job: &EncodeJob, _cancel: watch::Receiver<bool>) -> MediaResult<()> {
        self.log.record("encode");
        tokio::fs::write(&job.output, FAKE_OUTPUT).await?;
        *lock(&self.last_encode) = Some(job.clone());
        Ok(())
    }
}

/// [`CollaboratorFactory`] handing out the same fakes for every job.
#[derive(Clone)]
pub struct FakeFactory {
    services: FakeServices,
}

impl CollaboratorFactory for FakeFactory {
    fn build(
        &self,
        api_key: &str,
        _cancel: &watch::Receiver<bool>,
    ) -> Result<Collaborators, PipelineError> {
        if api_key == "invalid" {
            return Err(PipelineError::Config("API key rejected".to_string()));
        }
        Ok(self.services.collaborators())
    }
}
