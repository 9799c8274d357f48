//! Source video acquisition using yt-dlp.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Format selector preferring MP4 video with M4A audio.
pub const DEFAULT_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// File name the acquired source is stored under inside the job directory.
pub const SOURCE_FILE_NAME: &str = "input.mp4";

/// Fetches a source video into a local directory.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Store the video behind `locator` in `dest_dir` and return its path.
    async fn fetch(&self, locator: &str, dest_dir: &Path) -> MediaResult<PathBuf>;
}

/// [`VideoSource`] that shells out to `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    format: String,
    cookies: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            cookies: None,
            timeout_secs: None,
        }
    }
}

impl YtDlpSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a Netscape cookies file for authenticated sources.
    pub fn with_cookies(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies = Some(path.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn build_args(&self, url: &str, dest: &Path) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            dest.to_string_lossy().to_string(),
        ];

        if let Some(cookies) = self.cookies.as_ref().filter(|p| p.exists()) {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }

        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    async fn fetch(&self, locator: &str, dest_dir: &Path) -> MediaResult<PathBuf> {
        let dest = dest_dir.join(SOURCE_FILE_NAME);

        // Local files skip the downloader entirely.
        let local = Path::new(locator);
        if !is_remote(locator) && local.is_file() {
            info!("Copying local source {} to {}", local.display(), dest.display());
            tokio::fs::copy(local, &dest).await?;
            return Ok(dest);
        }

        check_ytdlp()?;

        info!("Downloading video from {} to {}", locator, dest.display());

        let args = self.build_args(locator, &dest);
        let mut command = Command::new("yt-dlp");
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout_secs {
            Some(secs) => tokio::time::timeout(std::time::Duration::from_secs(secs), command.output())
                .await
                .map_err(|_| MediaError::Timeout(secs))??,
            None => command.output().await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);

            let error_msg = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("Unknown error");
            if is_rate_limited(&stderr) {
                warn!(url = %locator, "Source rate limit detected");
            }

            return Err(MediaError::download_failed(format!(
                "yt-dlp failed: {}",
                error_msg.trim()
            )));
        }

        if !dest.exists() {
            return Err(MediaError::download_failed("Output file not created"));
        }

        let file_size = dest.metadata()?.len();
        info!(
            output = %dest.display(),
            size_mb = file_size as f64 / (1024.0 * 1024.0),
            "Downloaded video successfully"
        );

        Ok(dest)
    }
}

fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

fn is_rate_limited(stderr: &str) -> bool {
    stderr.contains("429")
        || stderr.contains("Too Many Requests")
        || stderr.contains("Sign in to confirm")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_args() {
        let source = YtDlpSource::new();
        let args = source.build_args("https://youtu.be/abc", Path::new("/tmp/job/input.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains(&format!("-f {}", DEFAULT_FORMAT)));
        assert!(joined.contains("--merge-output-format mp4"));
        assert!(joined.contains("-o /tmp/job/input.mp4"));
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc");
        assert!(!joined.contains("--cookies"));
    }

    #[test]
    fn test_missing_cookies_file_is_ignored() {
        let source = YtDlpSource::new().with_cookies("/nonexistent/cookies.txt");
        let args = source.build_args("https://youtu.be/abc", Path::new("out.mp4"));
        assert!(!args.iter().any(|a| a == "--cookies"));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited("ERROR: HTTP Error 429: Too Many Requests"));
        assert!(!is_rate_limited("ERROR: Video unavailable"));
    }

    #[tokio::test]
    async fn test_local_file_is_copied() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("clip.mp4");
        tokio::fs::write(&src, b"not really a video").await.unwrap();

        let dest = YtDlpSource::new()
            .fetch(src.to_str().unwrap(), dir.path())
            .await
            .unwrap();

        assert_eq!(dest, dir.path().join(SOURCE_FILE_NAME));
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"not really a video");
        assert!(src.exists());
    }
}
