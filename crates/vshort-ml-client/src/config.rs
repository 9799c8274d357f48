use std::time::Duration;

/// Default OpenAI-compatible base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-large-v3";
pub const DEFAULT_RANKING_MODEL: &str = "llama3-70b-8192";

/// Configuration for the Groq clients.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    pub transcription_model: String,
    pub ranking_model: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            ranking_model: DEFAULT_RANKING_MODEL.to_string(),
            timeout: Duration::from_secs(300),
            max_retries: 2,
        }
    }
}

impl GroqConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("GROQ_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            transcription_model: std::env::var("GROQ_TRANSCRIPTION_MODEL")
                .unwrap_or(defaults.transcription_model),
            ranking_model: std::env::var("GROQ_RANKING_MODEL").unwrap_or(defaults.ranking_model),
            timeout: std::env::var("GROQ_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("GROQ_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    /// Point the clients at another server (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GroqConfig::default();
        assert_eq!(config.transcription_model, "whisper-large-v3");
        assert_eq!(config.ranking_model, "llama3-70b-8192");
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_endpoint_joining() {
        let config = GroqConfig::default().with_base_url("http://localhost:9000/v1/");
        assert_eq!(
            config.endpoint("/chat/completions"),
            "http://localhost:9000/v1/chat/completions"
        );
    }
}
