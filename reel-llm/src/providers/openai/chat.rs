//! OpenAI chat completion backend

use super::client::OpenAIClient;
use super::types::{CompletionRequest, CompletionResponse, Message};
use crate::providers::invalid_response;
use crate::{CompletionBackend, CompletionPrompt, UsageTracker};
use async_trait::async_trait;
use reel_core::ReelResult;
use std::sync::Arc;

/// Default chat model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Chat completion backend using GPT models.
pub struct OpenAIChat {
    client: OpenAIClient,
    model: String,
    usage: Arc<UsageTracker>,
}

impl OpenAIChat {
    /// Create a new OpenAI chat backend.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4o-mini", "gpt-4o")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(OpenAIClient::new(api_key, 60), model)
    }

    /// Create a backend with default gpt-4o-mini model.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, DEFAULT_OPENAI_MODEL)
    }

    /// Wrap an already configured client.
    pub fn with_client(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            usage: Arc::new(UsageTracker::new()),
        }
    }

    /// Share a usage tracker with other backends.
    pub fn with_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }
}

#[async_trait]
impl CompletionBackend for OpenAIChat {
    async fn complete(&self, prompt: &CompletionPrompt) -> ReelResult<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(prompt.system.clone()),
                Message::user(prompt.user.clone()),
            ],
            max_tokens: Some(prompt.max_tokens),
            temperature: Some(prompt.temperature),
        };

        let response: CompletionResponse =
            self.client.request("chat/completions", &request).await?;

        if let Some(usage) = &response.usage {
            self.usage.record_completion(
                usage.prompt_tokens,
                usage.completion_tokens.unwrap_or(0),
            );
        }

        response
            .first_text()
            .ok_or_else(|| invalid_response(self.client.provider(), "No completion in response"))
    }

    fn provider_name(&self) -> &str {
        self.client.provider()
    }
}

impl std::fmt::Debug for OpenAIChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIChat")
            .field("model", &self.model)
            .field("client", &self.client)
            .finish()
    }
}
