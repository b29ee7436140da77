// Completions implementation using OpenAI
//
// This is the infrastructure implementation of BaseCompletions.
// Business logic (what to prompt for) lives in the domain layers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient};

use super::BaseCompletions;

/// Sampling temperature for all content generation steps.
const TEMPERATURE: f32 = 0.7;

/// Completion cap for all content generation steps.
const MAX_TOKENS: u32 = 4000;

/// OpenAI implementation of completions
#[derive(Clone)]
pub struct OpenAiCompletions {
    client: OpenAIClient,
    model: String,
}

impl OpenAiCompletions {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: OpenAIClient::new(api_key),
            model: model.into(),
        }
    }

    /// Wrap an existing client (custom base URL, retry budget, input cap).
    pub fn with_client(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl BaseCompletions for OpenAiCompletions {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(system_prompt))
            .message(Message::user(user_prompt))
            .temperature(TEMPERATURE)
            .max_tokens(MAX_TOKENS);

        let response = self
            .client
            .chat_completion(request)
            .await
            .context("OpenAI completion failed")?;

        Ok(response.content)
    }
}
