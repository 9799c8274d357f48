//! The external services a pipeline run talks to.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use vshort_media::{
    AudioExtractor, CaptionRenderer, CenterLocator, ClipReframer, DrawtextRenderer,
    FaceLocator, FfmpegAudioExtractor, FfmpegEncoder, FfmpegReframer, FfprobeProber,
    MediaEncoder, MediaProber, UltraFaceConfig, UltraFaceLocator, VideoSource, YtDlpSource,
};
use vshort_ml_client::{GroqClient, GroqRanker, GroqTranscriber, SegmentRanker, Transcriber};
use vshort_models::CaptionStyle;

use crate::config::WorkerConfig;
use crate::error::PipelineError;

/// One handle per pipeline dependency.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn VideoSource>,
    pub prober: Arc<dyn MediaProber>,
    pub audio: Arc<dyn AudioExtractor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub ranker: Arc<dyn SegmentRanker>,
    pub reframer: Arc<dyn ClipReframer>,
    pub captions: Arc<dyn CaptionRenderer>,
    pub encoder: Arc<dyn MediaEncoder>,
}

/// Builds the collaborators for one job.
///
/// The API key arrives with each request, so clients are built per job.
pub trait CollaboratorFactory: Send + Sync {
    fn build(
        &self,
        api_key: &str,
        cancel: &watch::Receiver<bool>,
    ) -> Result<Collaborators, PipelineError>;
}

/// Production wiring: yt-dlp, FFmpeg, Groq and the UltraFace detector.
pub struct DefaultCollaboratorFactory {
    config: Arc<WorkerConfig>,
    locator: Arc<dyn FaceLocator>,
}

impl DefaultCollaboratorFactory {
    /// Load the face model once. Falls back to center cropping without it.
    pub fn new(config: Arc<WorkerConfig>) -> Self {
        let face_config = UltraFaceConfig {
            model_path: config.face_model_path.clone(),
            confidence_threshold: config.face_confidence,
            ..UltraFaceConfig::default()
        };

        let locator: Arc<dyn FaceLocator> = match UltraFaceLocator::new(face_config) {
            Ok(locator) => Arc::new(locator),
            Err(e) => {
                warn!(
                    error = %e,
                    "Face detector unavailable, every frame will use a center crop"
                );
                Arc::new(CenterLocator)
            }
        };
        info!(locator = locator.name(), "Reframing locator selected");

        Self { config, locator }
    }

    pub fn locator_name(&self) -> &'static str {
        self.locator.name()
    }
}

impl CollaboratorFactory for DefaultCollaboratorFactory {
    fn build(
        &self,
        api_key: &str,
        cancel: &watch::Receiver<bool>,
    ) -> Result<Collaborators, PipelineError> {
        let client = GroqClient::new(self.config.groq.clone(), api_key)
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut source = YtDlpSource::new();
        if let Some(cookies) = &self.config.cookies_path {
            source = source.with_cookies(cookies);
        }

        let reframer = FfmpegReframer::new(Arc::clone(&self.locator))
            .with_smoothing_window(self.config.smoothing_window)
            .with_fps(self.config.encoding.fps);

        let captions = DrawtextRenderer::new(&self.config.font_path, CaptionStyle::default())
            .with_cancel(cancel.clone());

        Ok(Collaborators {
            source: Arc::new(source),
            prober: Arc::new(FfprobeProber),
            audio: Arc::new(FfmpegAudioExtractor::new()),
            transcriber: Arc::new(GroqTranscriber::new(client.clone())),
            ranker: Arc::new(GroqRanker::new(client)),
            reframer: Arc::new(reframer),
            captions: Arc::new(captions),
            encoder: Arc::new(FfmpegEncoder::new(self.config.encoding.clone())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> DefaultCollaboratorFactory {
        let config = WorkerConfig {
            face_model_path: "does/not/exist.onnx".into(),
            ..WorkerConfig::default()
        };
        DefaultCollaboratorFactory::new(Arc::new(config))
    }

    #[test]
    fn test_missing_model_falls_back_to_center() {
        assert_eq!(factory().locator_name(), CenterLocator.name());
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let (_tx, rx) = watch::channel(false);
        let err = factory().build("  ", &rx).err().unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(factory().build("gsk_test", &rx).is_ok());
    }
}
