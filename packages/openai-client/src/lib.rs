//! OpenAI chat completions REST client
//!
//! A minimal client for the OpenAI chat completions API with no
//! domain-specific logic. Transient failures (rate limits, server errors,
//! transport errors) are retried with exponential backoff; oversized message
//! content is truncated instead of rejected.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, ChatRequest, Message};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! let response = client.chat_completion(ChatRequest {
//!     model: "gpt-4.1".into(),
//!     messages: vec![Message::user("Hello!")],
//!     ..Default::default()
//! }).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{OpenAIError, Result};
pub use types::*;

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_MAX_INPUT_CHARS: usize = 120_000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    max_attempts: u32,
    max_input_chars: usize,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the maximum number of attempts per request.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the per-message content cap. Longer content is truncated before
    /// sending rather than failing the request.
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Sends the conversation to the chat completions API. Rate limits
    /// (429), server errors (5xx), and transport failures are retried up to
    /// the configured attempt count with exponential backoff; other API
    /// errors fail immediately.
    pub async fn chat_completion(&self, mut request: ChatRequest) -> Result<ChatResponse> {
        for message in &mut request.messages {
            if message.content.chars().count() > self.max_input_chars {
                warn!(
                    role = %message.role,
                    max_chars = self.max_input_chars,
                    "Truncating oversized message content"
                );
                message.content = truncate_chars(&message.content, self.max_input_chars).to_string();
            }
        }

        let start = std::time::Instant::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_chat(&request).await {
                Ok(response) => {
                    debug!(
                        model = %request.model,
                        attempt,
                        duration_ms = start.elapsed().as_millis(),
                        "OpenAI chat completion"
                    );
                    return Ok(response);
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = Duration::from_secs(2u64.pow(attempt).min(60));
                    warn!(
                        error = %err,
                        attempt,
                        retry_in_secs = delay.as_secs(),
                        "OpenAI request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| OpenAIError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let chat_response: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OpenAIError::EmptyResponse)?;

        Ok(ChatResponse {
            content,
            usage: chat_response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAIClient::new("sk-test")
            .with_base_url("https://custom.api.com")
            .with_max_attempts(5)
            .with_max_input_chars(1000);

        assert_eq!(client.base_url, "https://custom.api.com");
        assert_eq!(client.max_attempts, 5);
        assert_eq!(client.max_input_chars, 1000);
    }

    #[test]
    fn test_max_attempts_floor() {
        let client = OpenAIClient::new("sk-test").with_max_attempts(0);
        assert_eq!(client.max_attempts, 1);
    }
}
