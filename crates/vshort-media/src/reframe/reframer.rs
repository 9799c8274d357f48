use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;
use vshort_models::{OUTPUT_FPS, OUTPUT_HEIGHT, OUTPUT_WIDTH};

use super::face::FaceLocator;
use super::frames::{FfmpegFrameReader, FfmpegFrameWriter, FrameSink, FrameSource};
use super::tracker::{CropTracker, DEFAULT_SMOOTHING_WINDOW};
use super::transform::FrameTransform;
use crate::error::{MediaError, MediaResult};

/// One clip to reframe.
#[derive(Debug, Clone)]
pub struct ReframeRequest {
    pub source: PathBuf,
    /// Window start in source seconds
    pub start: f64,
    /// Window end in source seconds
    pub end: f64,
    /// Decoded source frame size
    pub source_width: u32,
    pub source_height: u32,
    /// Video-only output file
    pub output: PathBuf,
}

impl ReframeRequest {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Summary of a finished reframe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReframeStats {
    pub frames: u64,
    /// Frames where no face was found (center used instead)
    pub face_misses: u64,
    /// Width of the 9:16 window cut from the source
    pub crop_width: u32,
}

/// Turns a window of a landscape video into a vertical, face-following clip.
///
/// Blocking; callers run it on a blocking thread.
pub trait ClipReframer: Send + Sync {
    fn reframe(
        &self,
        request: &ReframeRequest,
        cancel: &watch::Receiver<bool>,
    ) -> MediaResult<ReframeStats>;
}

/// Drive frames from `source` through `transform` into `sink`, in order.
///
/// The cancel flag is checked before every frame.
pub fn run_reframe<S, K>(
    source: &mut S,
    sink: &mut K,
    transform: &mut FrameTransform,
    cancel: &watch::Receiver<bool>,
) -> MediaResult<ReframeStats>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
{
    let mut frames = 0u64;

    loop {
        if *cancel.borrow() {
            return Err(MediaError::Cancelled);
        }

        let Some(frame) = source.next_frame()? else {
            break;
        };

        let output = transform.apply(&frame)?;
        sink.write_frame(&output)?;
        frames += 1;
    }

    if frames == 0 {
        return Err(MediaError::InvalidVideo(
            "No frames decoded in the selected window".to_string(),
        ));
    }

    sink.finish()?;

    Ok(ReframeStats {
        frames,
        face_misses: transform.face_misses(),
        crop_width: transform.target_width(),
    })
}

/// [`ClipReframer`] decoding and encoding through FFmpeg pipes.
pub struct FfmpegReframer {
    locator: Arc<dyn FaceLocator>,
    smoothing_window: usize,
    fps: u32,
}

impl FfmpegReframer {
    pub fn new(locator: Arc<dyn FaceLocator>) -> Self {
        Self {
            locator,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            fps: OUTPUT_FPS,
        }
    }

    pub fn with_smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = window;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }
}

impl ClipReframer for FfmpegReframer {
    fn reframe(
        &self,
        request: &ReframeRequest,
        cancel: &watch::Receiver<bool>,
    ) -> MediaResult<ReframeStats> {
        if !request.source.exists() {
            return Err(MediaError::FileNotFound(request.source.clone()));
        }
        if request.duration() <= 0.0 {
            return Err(MediaError::InvalidVideo(format!(
                "Empty reframe window {:.2}-{:.2}",
                request.start, request.end
            )));
        }
        if request.source_width == 0 || request.source_height == 0 {
            return Err(MediaError::InvalidVideo("Source has no dimensions".to_string()));
        }

        let started = Instant::now();
        info!(
            source = %request.source.display(),
            start = request.start,
            end = request.end,
            locator = self.locator.name(),
            "Reframing clip"
        );

        let mut reader = FfmpegFrameReader::open(
            &request.source,
            request.start,
            request.duration(),
            request.source_width,
            request.source_height,
            self.fps,
        )?;
        let mut writer =
            FfmpegFrameWriter::create(&request.output, OUTPUT_WIDTH, OUTPUT_HEIGHT, self.fps)?;
        let mut transform = FrameTransform::new(
            Arc::clone(&self.locator),
            CropTracker::new(self.smoothing_window),
            request.source_width,
            request.source_height,
            OUTPUT_WIDTH,
            OUTPUT_HEIGHT,
        );

        let stats = run_reframe(&mut reader, &mut writer, &mut transform, cancel)?;

        counter!("vshort_frames_reframed_total").increment(stats.frames);
        counter!("vshort_face_misses_total").increment(stats.face_misses);
        info!(
            frames = stats.frames,
            face_misses = stats.face_misses,
            crop_width = stats.crop_width,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reframing complete"
        );

        Ok(stats)
    }
}
