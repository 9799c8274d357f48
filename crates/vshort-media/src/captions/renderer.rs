//! Caption overlay rendering with FFmpeg's `drawtext` filter.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;
use vshort_models::{CaptionChunk, CaptionStyle};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// A rendered caption image and the clip interval it is shown for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionOverlay {
    /// Transparent RGBA PNG the size of the output frame
    pub path: PathBuf,
    pub start: f64,
    pub end: f64,
}

/// Rasterizes caption chunks into full-frame transparent overlays.
#[async_trait]
pub trait CaptionRenderer: Send + Sync {
    async fn render(
        &self,
        chunk: &CaptionChunk,
        index: usize,
        out_dir: &Path,
    ) -> MediaResult<CaptionOverlay>;
}

/// Render every chunk in order. The first failure aborts the batch.
pub async fn render_all(
    renderer: &dyn CaptionRenderer,
    chunks: &[CaptionChunk],
    out_dir: &Path,
) -> MediaResult<Vec<CaptionOverlay>> {
    tokio::fs::create_dir_all(out_dir).await?;

    let mut overlays = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        overlays.push(renderer.render(chunk, index, out_dir).await?);
    }
    Ok(overlays)
}

/// [`CaptionRenderer`] drawing text onto a transparent lavfi canvas.
#[derive(Debug, Clone)]
pub struct DrawtextRenderer {
    font_path: PathBuf,
    style: CaptionStyle,
    cancel: Option<watch::Receiver<bool>>,
}

impl DrawtextRenderer {
    pub fn new(font_path: impl Into<PathBuf>, style: CaptionStyle) -> Self {
        Self {
            font_path: font_path.into(),
            style,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn font_path(&self) -> &Path {
        &self.font_path
    }

    /// Build the FFmpeg command rendering the text in `text_file` to `output`.
    pub fn build_command(&self, text_file: &Path, output: &Path) -> FfmpegCommand {
        let canvas = format!(
            "color=c=black@0.0:s={}x{},format=rgba",
            self.style.canvas_width, self.style.canvas_height
        );

        FfmpegCommand::lavfi(canvas, output)
            .video_filter(drawtext_filter(&self.style, &self.font_path, text_file))
            .single_frame()
    }
}

#[async_trait]
impl CaptionRenderer for DrawtextRenderer {
    async fn render(
        &self,
        chunk: &CaptionChunk,
        index: usize,
        out_dir: &Path,
    ) -> MediaResult<CaptionOverlay> {
        if !self.font_path.is_file() {
            return Err(MediaError::FontUnavailable(self.font_path.clone()));
        }

        // Text goes through a file so quotes and colons need no escaping.
        let text_file = out_dir.join(format!("caption_{:04}.txt", index));
        let output = out_dir.join(format!("caption_{:04}.png", index));
        tokio::fs::write(&text_file, &chunk.text).await?;

        debug!(index, text = %chunk.text, "Rendering caption overlay");

        let cmd = self.build_command(&text_file, &output);
        let runner = match &self.cancel {
            Some(cancel) => FfmpegRunner::new().with_cancel(cancel.clone()),
            None => FfmpegRunner::new(),
        };
        runner.run(&cmd).await?;

        Ok(CaptionOverlay {
            path: output,
            start: chunk.start,
            end: chunk.end,
        })
    }
}

/// `drawtext` filter centering the text box on the style's anchor.
fn drawtext_filter(style: &CaptionStyle, font: &Path, text_file: &Path) -> String {
    format!(
        "drawtext=fontfile={}:textfile={}:fontsize={}:fontcolor={}:borderw={}:bordercolor={}:x={}-text_w/2:y={}-text_h/2",
        escape_filter_value(&font.to_string_lossy()),
        escape_filter_value(&text_file.to_string_lossy()),
        style.font_size,
        ffmpeg_color(&style.fill_color),
        style.stroke_width,
        ffmpeg_color(&style.stroke_color),
        style.anchor_x,
        style.anchor_y,
    )
}

/// `#RRGGBB` becomes `0xRRGGBB`; named colors pass through.
fn ffmpeg_color(color: &str) -> String {
    match color.strip_prefix('#') {
        Some(hex) => format!("0x{}", hex),
        None => color.to_string(),
    }
}

/// Escape a value for use as a filter option inside a filtergraph.
///
/// Applies option-level escaping first, then graph-level escaping.
pub fn escape_filter_value(value: &str) -> String {
    let mut option = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option.push('\\');
        }
        option.push(c);
    }

    let mut graph = String::with_capacity(option.len());
    for c in option.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph.push('\\');
        }
        graph.push(c);
    }
    graph
}
