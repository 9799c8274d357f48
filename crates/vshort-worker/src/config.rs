//! Worker configuration.

use std::path::PathBuf;

use vshort_media::reframe::DEFAULT_SMOOTHING_WINDOW;
use vshort_ml_client::GroqConfig;
use vshort_models::{EncodingConfig, DEFAULT_CHUNK_SIZE};

/// File name of the published short.
pub const DEFAULT_OUTPUT_FILE: &str = "final_viral_short.mp4";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for per-job working directories
    pub work_dir: PathBuf,
    /// Directory the finished short is published to
    pub output_dir: PathBuf,
    pub output_file_name: String,
    /// TrueType font used for captions
    pub font_path: PathBuf,
    /// UltraFace ONNX model; center crop is used when absent
    pub face_model_path: PathBuf,
    pub face_confidence: f32,
    /// Number of face centers averaged for the crop
    pub smoothing_window: usize,
    /// Words shown per caption
    pub caption_chunk_size: usize,
    /// Optional Netscape cookies file for yt-dlp
    pub cookies_path: Option<PathBuf>,
    pub encoding: EncodingConfig,
    pub groq: GroqConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("vshort"),
            output_dir: PathBuf::from("."),
            output_file_name: DEFAULT_OUTPUT_FILE.to_string(),
            font_path: PathBuf::from("font.ttf"),
            face_model_path: PathBuf::from("models/face/version-RFB-320.onnx"),
            face_confidence: 0.5,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            caption_chunk_size: DEFAULT_CHUNK_SIZE,
            cookies_path: None,
            encoding: EncodingConfig::default(),
            groq: GroqConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("VSHORT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("VSHORT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            output_file_name: defaults.output_file_name,
            font_path: std::env::var("VSHORT_FONT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.font_path),
            face_model_path: std::env::var("VSHORT_FACE_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.face_model_path),
            face_confidence: std::env::var("VSHORT_FACE_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.face_confidence),
            smoothing_window: std::env::var("VSHORT_SMOOTHING_WINDOW")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.smoothing_window),
            caption_chunk_size: std::env::var("VSHORT_CAPTION_CHUNK")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.caption_chunk_size),
            cookies_path: std::env::var("VSHORT_COOKIES_FILE").ok().map(PathBuf::from),
            encoding: EncodingConfig::from_env(),
            groq: GroqConfig::from_env(),
        }
    }

    /// Where the finished short is published.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.smoothing_window, 15);
        assert_eq!(config.caption_chunk_size, 2);
        assert_eq!(config.output_path(), PathBuf::from("./final_viral_short.mp4"));
    }
}
