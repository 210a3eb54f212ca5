//! Reel LLM - Idea and Code Generation
//!
//! Provider-agnostic traits for the two generation steps of the feed
//! pipeline, plus the hosted-model backends that implement them.
//!
//! - [`IdeaSource`] yields a short game concept.
//! - [`CodeGenerator`] turns a concept into component source.
//! - [`CompletionBackend`] is the raw chat completion seam both LLM-backed
//!   implementations sit on.

pub mod fallback;
pub mod prompts;
pub mod providers;
pub mod template;

pub use fallback::{LocalIdeaGenerator, DEFAULT_CATALOGUE};
pub use prompts::parse_idea;
pub use providers::{AnthropicChat, AnthropicClient, OpenAIChat, OpenAIClient};
pub use template::TemplateCodeGenerator;

use async_trait::async_trait;
use reel_core::{strip_code_fences, Idea, LlmError, ReelError, ReelResult};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// PROVIDER TRAITS
// ============================================================================

/// A single chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPrompt {
    pub system: String,
    pub user: String,
    pub max_tokens: i32,
    pub temperature: f32,
}

/// Raw text completion backend.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete the prompt and return the model's text.
    async fn complete(&self, prompt: &CompletionPrompt) -> ReelResult<String>;

    /// Provider name for logs and errors.
    fn provider_name(&self) -> &str;
}

/// Source of game ideas.
#[async_trait]
pub trait IdeaSource: Send + Sync {
    /// Produce one idea. Errors mean the source is unavailable.
    async fn next_idea(&self) -> ReelResult<Idea>;

    fn name(&self) -> &str;
}

/// Turns an idea into component source code.
///
/// Output is raw: callers sanitize it before deploying.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, idea: &Idea) -> ReelResult<String>;
}

// ============================================================================
// LLM-BACKED IMPLEMENTATIONS
// ============================================================================

/// Idea source asking a chat model for a one-line concept.
#[derive(Clone)]
pub struct LlmIdeaSource {
    backend: Arc<dyn CompletionBackend>,
}

impl LlmIdeaSource {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl IdeaSource for LlmIdeaSource {
    async fn next_idea(&self) -> ReelResult<Idea> {
        let reply = self
            .backend
            .complete(&prompts::idea_prompt())
            .await
            .map_err(|e| ReelError::IdeaSourceUnavailable {
                reason: e.to_string(),
            })?;

        parse_idea(&reply).ok_or_else(|| ReelError::IdeaSourceUnavailable {
            reason: format!("{} returned no usable idea", self.backend.provider_name()),
        })
    }

    fn name(&self) -> &str {
        self.backend.provider_name()
    }
}

impl std::fmt::Debug for LlmIdeaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmIdeaSource")
            .field("provider", &self.backend.provider_name())
            .finish()
    }
}

/// Code generator asking a chat model for a complete component file.
#[derive(Clone)]
pub struct LlmCodeGenerator {
    backend: Arc<dyn CompletionBackend>,
    component_name: String,
}

impl LlmCodeGenerator {
    pub fn new(backend: Arc<dyn CompletionBackend>, component_name: impl Into<String>) -> Self {
        Self {
            backend,
            component_name: component_name.into(),
        }
    }
}

#[async_trait]
impl CodeGenerator for LlmCodeGenerator {
    async fn generate(&self, idea: &Idea) -> ReelResult<String> {
        let prompt = prompts::code_prompt(idea, &self.component_name);
        let reply = self.backend.complete(&prompt).await?;

        let code = strip_code_fences(&reply);
        if code.is_empty() {
            return Err(ReelError::Llm(LlmError::InvalidResponse {
                provider: self.backend.provider_name().to_string(),
                reason: "empty code completion".to_string(),
            }));
        }
        Ok(code)
    }
}

impl std::fmt::Debug for LlmCodeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmCodeGenerator")
            .field("provider", &self.backend.provider_name())
            .field("component_name", &self.component_name)
            .finish()
    }
}

// ============================================================================
// USAGE TRACKER
// ============================================================================

/// Token usage across completion calls.
pub struct UsageTracker {
    requests: AtomicU64,
    input_tokens: AtomicI64,
    output_tokens: AtomicI64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            input_tokens: AtomicI64::new(0),
            output_tokens: AtomicI64::new(0),
        }
    }

    /// Record one completion's token usage.
    pub fn record_completion(&self, input_tokens: i64, output_tokens: i64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn input_tokens(&self) -> i64 {
        self.input_tokens.load(Ordering::Relaxed)
    }

    pub fn output_tokens(&self) -> i64 {
        self.output_tokens.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.input_tokens.store(0, Ordering::Relaxed);
        self.output_tokens.store(0, Ordering::Relaxed);
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("requests", &self.requests())
            .field("input_tokens", &self.input_tokens())
            .field("output_tokens", &self.output_tokens())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Parsed ideas are never blank and never exceed the length cap.
        #[test]
        fn prop_parsed_idea_bounded(reply in "\\PC{0,300}") {
            if let Some(idea) = parse_idea(&reply) {
                prop_assert!(!idea.as_str().trim().is_empty());
                prop_assert!(idea.as_str().chars().count() <= prompts::MAX_IDEA_CHARS);
            }
        }
    }
}
