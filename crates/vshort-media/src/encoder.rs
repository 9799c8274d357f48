//! Final render: caption overlays composited onto the reframed video with the
//! source audio muxed back in.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};
use vshort_models::EncodingConfig;

use crate::captions::CaptionOverlay;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Audio taken from a window of the original source.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub source: PathBuf,
    /// Seconds into the source
    pub start: f64,
    pub duration: f64,
}

/// Everything needed to produce the output file.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// Video-only base layer
    pub video: PathBuf,
    /// Overlays stacked in order above the base layer
    pub overlays: Vec<CaptionOverlay>,
    pub audio: Option<AudioTrack>,
    pub output: PathBuf,
}

/// Composites layers and writes the final file.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    async fn encode(&self, job: &EncodeJob, cancel: watch::Receiver<bool>) -> MediaResult<()>;
}

/// [`MediaEncoder`] using a single FFmpeg overlay chain.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    config: EncodingConfig,
}

impl FfmpegEncoder {
    pub fn new(config: EncodingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    pub fn build_command(&self, job: &EncodeJob) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(&job.video, &job.output);
        for overlay in &job.overlays {
            cmd = cmd.add_input(&overlay.path);
        }

        if let Some(audio) = &job.audio {
            cmd = cmd
                .add_input(&audio.source)
                .seek(audio.start)
                .duration(audio.duration);
        }
        let audio_index = job.overlays.len() + 1;

        cmd = match overlay_chain(&job.overlays) {
            Some((graph, label)) => cmd.filter_complex(graph).map(label),
            None => cmd.map("0:v"),
        };

        if job.audio.is_some() {
            cmd = cmd.map(format!("{}:a?", audio_index)).output_arg("-shortest");
        }

        cmd.output_args(self.config.to_ffmpeg_args())
    }
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn encode(&self, job: &EncodeJob, cancel: watch::Receiver<bool>) -> MediaResult<()> {
        if !job.video.exists() {
            return Err(MediaError::FileNotFound(job.video.clone()));
        }

        info!(
            video = %job.video.display(),
            overlays = job.overlays.len(),
            output = %job.output.display(),
            "Encoding final video"
        );

        let cmd = self.build_command(job);
        let total_secs = job.audio.as_ref().map(|a| a.duration).unwrap_or(0.0);
        FfmpegRunner::new()
            .with_cancel(cancel)
            .run_with_progress(&cmd, move |progress| {
                if total_secs > 0.0 {
                    debug!(
                        percent = progress.percentage(total_secs),
                        speed = progress.speed,
                        "Encode progress"
                    );
                }
            })
            .await?;

        if !job.output.exists() {
            return Err(MediaError::ffmpeg_failed("Output file not created", None, None));
        }
        Ok(())
    }
}

/// `overlay` filters stacking each caption on the previous result while its
/// interval is active. Returns the graph and its output label.
fn overlay_chain(overlays: &[CaptionOverlay]) -> Option<(String, String)> {
    if overlays.is_empty() {
        return None;
    }

    let mut filters = Vec::with_capacity(overlays.len());
    let mut previous = "0:v".to_string();
    for (i, overlay) in overlays.iter().enumerate() {
        let label = format!("v{}", i + 1);
        filters.push(format!(
            "[{}][{}:v]overlay=0:0:enable='gte(t,{:.3})*lt(t,{:.3})'[{}]",
            previous,
            i + 1,
            overlay.start,
            overlay.end,
            label
        ));
        previous = label;
    }

    Some((filters.join(";"), format!("[{}]", previous)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(i: usize, start: f64, end: f64) -> CaptionOverlay {
        CaptionOverlay {
            path: PathBuf::from(format!("caption_{:04}.png", i)),
            start,
            end,
        }
    }

    fn job(overlays: Vec<CaptionOverlay>) -> EncodeJob {
        EncodeJob {
            video: PathBuf::from("reframed.mp4"),
            overlays,
            audio: Some(AudioTrack {
                source: PathBuf::from("input.mp4"),
                start: 10.0,
                duration: 60.0,
            }),
            output: PathBuf::from("final.mp4"),
        }
    }

    #[test]
    fn test_overlay_chain() {
        let (graph, label) =
            overlay_chain(&[overlay(0, 0.0, 0.5), overlay(1, 0.5, 1.25)]).unwrap();
        assert_eq!(
            graph,
            "[0:v][1:v]overlay=0:0:enable='gte(t,0.000)*lt(t,0.500)'[v1];\
             [v1][2:v]overlay=0:0:enable='gte(t,0.500)*lt(t,1.250)'[v2]"
        );
        assert_eq!(label, "[v2]");
        assert!(overlay_chain(&[]).is_none());
    }

    /// Evaluate an `enable='gte(t,S)*lt(t,E)'` expression the way FFmpeg does.
    fn enabled_at(filter: &str, t: f64) -> bool {
        let expr = filter
            .split("enable='")
            .nth(1)
            .and_then(|rest| rest.split('\'').next())
            .unwrap();
        let bound = |name: &str| -> f64 {
            let start = expr.find(&format!("{}(t,", name)).unwrap() + name.len() + 3;
            let end = start + expr[start..].find(')').unwrap();
            expr[start..end].parse().unwrap()
        };
        t >= bound("gte") && t < bound("lt")
    }

    #[test]
    fn test_adjacent_overlays_never_overlap() {
        let (graph, _) = overlay_chain(&[
            overlay(0, 0.0, 0.5),
            overlay(1, 0.5, 1.0),
            overlay(2, 1.0, 1.5),
        ])
        .unwrap();
        let filters: Vec<&str> = graph.split(';').collect();

        // Frame timestamps at 30 fps, boundaries included.
        for frame in 0..45 {
            let t = frame as f64 / 30.0;
            let visible = filters.iter().filter(|f| enabled_at(f, t)).count();
            assert_eq!(visible, 1, "captions visible at t={:.3}", t);
        }
        assert!(!enabled_at(filters[0], 0.5));
        assert!(enabled_at(filters[1], 0.5));
    }

    #[test]
    fn test_command_with_captions_and_audio() {
        let encoder = FfmpegEncoder::default();
        let args = encoder
            .build_command(&job(vec![overlay(0, 0.0, 1.0)]))
            .build_args()
            .join(" ");

        assert!(args.contains("-i reframed.mp4 -i caption_0000.png -ss 10.000 -t 60.000 -i input.mp4"));
        assert!(args.contains("-map [v1] -map 2:a? -shortest"));
        assert!(args.contains("-c:v libx264"));
        assert!(args.contains("-r 30"));
        assert!(args.ends_with("final.mp4"));
    }

    #[test]
    fn test_command_without_captions() {
        let args = FfmpegEncoder::default()
            .build_command(&job(Vec::new()))
            .build_args()
            .join(" ");
        assert!(!args.contains("-filter_complex"));
        assert!(args.contains("-map 0:v -map 1:a?"));
    }
}
