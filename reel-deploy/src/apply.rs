//! Apply engine adapters.

use crate::ApplyEngine;
use async_trait::async_trait;
use reel_core::{ApplyError, ReelError, ReelResult};
use reel_llm::providers::openai::types::{CompletionRequest, CompletionResponse, Message};
use reel_llm::OpenAIClient;

/// Default OpenAI-compatible fast-apply endpoint.
pub const DEFAULT_APPLY_BASE_URL: &str = "https://api.morphllm.com/v1";

/// Default fast-apply model.
pub const DEFAULT_APPLY_MODEL: &str = "morph-v3-fast";

// ============================================================================
// CHAT APPLY ENGINE
// ============================================================================

/// Apply engine backed by an OpenAI-compatible chat completions endpoint.
///
/// Sends the instruction, current code and update as tagged sections in a
/// single user message and takes the first choice as the merged file.
#[derive(Debug)]
pub struct ChatApplyEngine {
    client: OpenAIClient,
    model: String,
}

impl ChatApplyEngine {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Engine against the default fast-apply service.
    pub fn morph(api_key: impl Into<String>) -> Self {
        let client = OpenAIClient::new(api_key, 60)
            .with_base_url(DEFAULT_APPLY_BASE_URL)
            .with_provider_name("morph");
        Self::new(client, DEFAULT_APPLY_MODEL)
    }

    pub(crate) fn build_request(&self, current: &str, instruction: &str, update: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(format!(
                "<instruction>{}</instruction>\n<code>{}</code>\n<update>{}</update>",
                instruction, current, update
            ))],
            max_tokens: None,
            temperature: None,
        }
    }
}

#[async_trait]
impl ApplyEngine for ChatApplyEngine {
    async fn apply(&self, current: &str, instruction: &str, update: &str) -> ReelResult<String> {
        let request = self.build_request(current, instruction, update);

        let response: CompletionResponse = self
            .client
            .request("chat/completions", &request)
            .await
            .map_err(|e| service_error(e.to_string()))?;

        response
            .first_text()
            .ok_or_else(|| service_error(format!("{} returned no choices", self.client.provider())))
    }

    fn name(&self) -> &str {
        self.client.provider()
    }
}

fn service_error(reason: impl Into<String>) -> ReelError {
    ReelError::ApplyFailed(ApplyError::Service {
        reason: reason.into(),
    })
}

// ============================================================================
// REPLACE APPLY ENGINE
// ============================================================================

/// Full-file replacement: the update becomes the new file verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceApplyEngine;

#[async_trait]
impl ApplyEngine for ReplaceApplyEngine {
    async fn apply(&self, _current: &str, _instruction: &str, update: &str) -> ReelResult<String> {
        Ok(update.to_string())
    }

    fn name(&self) -> &str {
        "replace"
    }
}
