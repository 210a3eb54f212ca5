//! Anthropic chat backend

use super::client::AnthropicClient;
use super::types::{Message, MessageRequest, MessageResponse};
use crate::providers::invalid_response;
use crate::{CompletionBackend, CompletionPrompt, UsageTracker};
use async_trait::async_trait;
use reel_core::ReelResult;
use std::sync::Arc;

/// Default Claude model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

/// Completion backend using Claude models.
pub struct AnthropicChat {
    client: AnthropicClient,
    model: String,
    usage: Arc<UsageTracker>,
}

impl AnthropicChat {
    /// Create a new Anthropic chat backend.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `model` - Model name (e.g., "claude-3-5-haiku-latest")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: AnthropicClient::new(api_key, 50),
            model: model.into(),
            usage: Arc::new(UsageTracker::new()),
        }
    }

    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, DEFAULT_ANTHROPIC_MODEL)
    }

    pub fn with_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }
}

#[async_trait]
impl CompletionBackend for AnthropicChat {
    async fn complete(&self, prompt: &CompletionPrompt) -> ReelResult<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.user.clone(),
            }],
            max_tokens: prompt.max_tokens,
            system: Some(prompt.system.clone()),
            temperature: Some(prompt.temperature),
        };

        let response: MessageResponse = self.client.request("messages", &request).await?;
        self.usage
            .record_completion(response.usage.input_tokens, response.usage.output_tokens);

        let text = response.text();
        if text.is_empty() {
            return Err(invalid_response("anthropic", "No text content in response"));
        }
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }
}

impl std::fmt::Debug for AnthropicChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicChat")
            .field("model", &self.model)
            .field("client", &self.client)
            .finish()
    }
}
