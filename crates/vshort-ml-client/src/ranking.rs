//! Viral segment selection via a chat completion model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use vshort_models::ViralSegment;

use crate::client::{strip_code_fence, GroqClient};
use crate::error::{MlError, MlResult};

const SYSTEM_PROMPT: &str = "You are a master video editor. Analyze this transcript. \
Find the single most engaging, funny, or high-retention 60-second segment.";

/// Picks the window of the source to turn into a short.
#[async_trait]
pub trait SegmentRanker: Send + Sync {
    async fn select_segment(&self, transcript_text: &str) -> MlResult<ViralSegment>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// [`SegmentRanker`] backed by a Groq-hosted chat model in JSON mode.
#[derive(Debug, Clone)]
pub struct GroqRanker {
    client: GroqClient,
}

impl GroqRanker {
    pub fn new(client: GroqClient) -> Self {
        Self { client }
    }

    fn user_prompt(transcript_text: &str) -> String {
        format!(
            "Transcript (each line is [start - end] in HH:MM:SS from the start of the video):\n\
             {transcript_text}\n\n\
             Return ONLY a JSON object: {{\"start\": float, \"end\": float, \"reason\": string}} \
             where start and end are seconds from the start of the video."
        )
    }
}

#[async_trait]
impl SegmentRanker for GroqRanker {
    async fn select_segment(&self, transcript_text: &str) -> MlResult<ViralSegment> {
        if transcript_text.trim().is_empty() {
            return Err(MlError::InvalidInput("Transcript is empty".to_string()));
        }

        let model = &self.client.config().ranking_model;
        info!(model = %model, chars = transcript_text.len(), "Ranking transcript");

        let body = json!({
            "model": model,
            "messages": [
                ChatMessage { role: "system", content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user", content: Self::user_prompt(transcript_text) },
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.2,
        });

        let response = self
            .client
            .with_retry(|| {
                let request = self.client.post("chat/completions").json(&body);
                async move { self.client.send(request).await }
            })
            .await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| MlError::InvalidResponse(format!("Chat body: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MlError::InvalidResponse("No content in chat response".to_string()))?;

        debug!(content = %content, "Ranking response");
        parse_segment(&content)
    }
}

/// Parse the model's JSON answer into a segment.
pub fn parse_segment(content: &str) -> MlResult<ViralSegment> {
    serde_json::from_str(strip_code_fence(content))
        .map_err(|e| MlError::InvalidResponse(format!("Failed to parse segment JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroqConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ranker(server: &MockServer) -> GroqRanker {
        let config = GroqConfig::default()
            .with_base_url(server.uri())
            .with_max_retries(0);
        GroqRanker::new(GroqClient::new(config, "test-key").unwrap())
    }

    fn chat_body(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_parse_segment_variants() {
        let segment = parse_segment(r#"{"start": 10, "end": 70.5, "reason": "punchline"}"#).unwrap();
        assert_eq!((segment.start, segment.end), (10.0, 70.5));

        let fenced = parse_segment("```json\n{\"start\": \"00:01:00\", \"end\": \"00:02:00\"}\n```").unwrap();
        assert_eq!((fenced.start, fenced.end), (60.0, 120.0));

        assert!(matches!(
            parse_segment("I think the best part is at 1:00"),
            Err(MlError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_select_segment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "llama3-70b-8192",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                r#"{"start": 10.0, "end": 70.0, "reason": "big laugh"}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let segment = ranker(&server)
            .select_segment("[00:00:00 - 00:00:05] hello")
            .await
            .unwrap();
        assert_eq!(segment, ViralSegment::new(10.0, 70.0, "big laugh"));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = ranker(&server).select_segment("text").await.unwrap_err();
        assert!(matches!(err, MlError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_transcript_is_rejected() {
        let server = MockServer::start().await;
        let err = ranker(&server).select_segment("  \n").await.unwrap_err();
        assert!(matches!(err, MlError::InvalidInput(_)));
    }
}
