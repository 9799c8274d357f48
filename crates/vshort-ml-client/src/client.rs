//! Shared HTTP client with authentication and retries.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::warn;

use crate::config::GroqConfig;
use crate::error::{MlError, MlResult};

/// Authenticated client for one API key.
#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    config: GroqConfig,
    api_key: String,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl GroqClient {
    pub fn new(config: GroqConfig, api_key: impl Into<String>) -> MlResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MlError::InvalidInput("API key is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &GroqConfig {
        &self.config
    }

    /// Authenticated POST to `path` under the base URL.
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.config.endpoint(path))
            .bearer_auth(&self.api_key)
    }

    /// Send a request and map HTTP failures onto [`MlError`].
    pub async fn send(&self, request: RequestBuilder) -> MlResult<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MlError::Timeout(self.config.timeout.as_secs())
            } else {
                MlError::Network(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("{} returned {}: {}", self.config.base_url, status, body);
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(MlError::ServiceUnavailable(message))
        } else {
            Err(MlError::RequestFailed(message))
        }
    }

    /// Execute with retry logic.
    pub async fn with_retry<F, Fut, T>(&self, operation: F) -> MlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = MlResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Remove a surrounding markdown code fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}
