//! Speech-to-text via the `/audio/transcriptions` endpoint.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};
use vshort_models::{Transcript, TranscriptSegment};

use crate::client::GroqClient;
use crate::error::{MlError, MlResult};

/// Produces a timed transcript for an audio or video file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media: &Path) -> MlResult<Transcript>;
}

/// `verbose_json` response body.
#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    language: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

impl From<VerboseTranscription> for Transcript {
    fn from(response: VerboseTranscription) -> Self {
        let mut segments: Vec<TranscriptSegment> = response
            .segments
            .into_iter()
            .map(|s| TranscriptSegment::new(s.text.trim(), s.start, s.end))
            .collect();

        // Some servers omit segments; keep the text as one span.
        if segments.is_empty() && !response.text.trim().is_empty() {
            segments.push(TranscriptSegment::new(
                response.text.trim(),
                0.0,
                response.duration.unwrap_or(0.0),
            ));
        }

        Transcript {
            segments,
            language: response.language,
            duration: response.duration,
        }
    }
}

/// [`Transcriber`] backed by Whisper on Groq.
#[derive(Debug, Clone)]
pub struct GroqTranscriber {
    client: GroqClient,
}

impl GroqTranscriber {
    pub fn new(client: GroqClient) -> Self {
        Self { client }
    }

    fn form(&self, bytes: Vec<u8>, file_name: String) -> MlResult<Form> {
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(MlError::Network)?;

        Ok(Form::new()
            .text("model", self.client.config().transcription_model.clone())
            .text("response_format", "verbose_json")
            .part("file", part))
    }
}

#[async_trait]
impl Transcriber for GroqTranscriber {
    async fn transcribe(&self, media: &Path) -> MlResult<Transcript> {
        let bytes = tokio::fs::read(media).await?;
        let file_name = media
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        info!(
            file = %media.display(),
            size_kb = bytes.len() / 1024,
            model = %self.client.config().transcription_model,
            "Transcribing audio"
        );

        let response = self
            .client
            .with_retry(|| {
                let form = self.form(bytes.clone(), file_name.clone());
                async move {
                    let request = self.client.post("audio/transcriptions").multipart(form?);
                    self.client.send(request).await
                }
            })
            .await?;

        let body: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| MlError::InvalidResponse(format!("Transcription body: {}", e)))?;
        let transcript = Transcript::from(body);

        debug!(
            segments = transcript.segments.len(),
            language = ?transcript.language,
            "Transcription complete"
        );
        Ok(transcript)
    }
}
