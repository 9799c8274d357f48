//! FFmpeg-based media processing for vshort.
//!
//! This crate provides:
//! - FFmpeg command building and execution with cancellation
//! - Video acquisition (yt-dlp), probing and audio extraction
//! - Face-tracked 9:16 reframing
//! - Word-burst caption timing and rendering
//! - The final overlay/mux encode

pub mod audio;
pub mod captions;
pub mod command;
pub mod download;
pub mod encoder;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod reframe;

pub use audio::{AudioExtractor, FfmpegAudioExtractor};
pub use captions::{
    chunk_words, expand_words, render_all, CaptionOverlay, CaptionRenderer, DrawtextRenderer,
};
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::{VideoSource, YtDlpSource};
pub use encoder::{AudioTrack, EncodeJob, FfmpegEncoder, MediaEncoder};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{move_file, remove_if_exists};
pub use probe::{probe_video, FfprobeProber, MediaProber, VideoInfo};
pub use progress::FfmpegProgress;
pub use reframe::{
    CenterLocator, ClipReframer, CropTracker, FaceDetection, FaceLocator, FfmpegReframer,
    ReframeRequest, ReframeStats, UltraFaceConfig, UltraFaceLocator,
};
