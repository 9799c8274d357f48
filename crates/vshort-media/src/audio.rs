//! Audio track extraction for transcription.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::watch;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Pulls the audio track out of a video file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, video: &Path, dest: &Path, cancel: watch::Receiver<bool>)
        -> MediaResult<()>;
}

/// [`AudioExtractor`] that writes an MP3 with FFmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegAudioExtractor {
    bitrate: String,
}

impl Default for FfmpegAudioExtractor {
    fn default() -> Self {
        Self {
            bitrate: "128k".to_string(),
        }
    }
}

impl FfmpegAudioExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_command(&self, video: &Path, dest: &Path) -> FfmpegCommand {
        FfmpegCommand::new(video, dest)
            .no_video()
            .audio_codec("libmp3lame")
            .audio_bitrate(self.bitrate.clone())
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract(
        &self,
        video: &Path,
        dest: &Path,
        cancel: watch::Receiver<bool>,
    ) -> MediaResult<()> {
        if !video.exists() {
            return Err(MediaError::FileNotFound(video.to_path_buf()));
        }

        info!("Extracting audio from {} to {}", video.display(), dest.display());

        let cmd = self.build_command(video, dest);
        FfmpegRunner::new().with_cancel(cancel).run(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_command() {
        let cmd = FfmpegAudioExtractor::new().build_command(Path::new("in.mp4"), Path::new("audio.mp3"));
        let args = cmd.build_args().join(" ");
        assert!(args.contains("-i in.mp4 -vn -c:a libmp3lame -b:a 128k audio.mp3"));
    }
}
