//! Collaborator wiring from [`ServerConfig`].

use crate::config::{LlmProvider, ServerConfig};
use reel_core::{ConfigError, ReelError, ReelResult};
use reel_deploy::{ApplyEngine, ChatApplyEngine, DeploySink, DirectorySink, MemorySink, ReplaceApplyEngine};
use reel_feed::Collaborators;
use reel_llm::{
    AnthropicChat, CodeGenerator, CompletionBackend, IdeaSource, LlmCodeGenerator, LlmIdeaSource,
    LocalIdeaGenerator, OpenAIChat, OpenAIClient, TemplateCodeGenerator, UsageTracker,
};
use std::sync::Arc;

/// Requests per minute granted to the merge service client.
const APPLY_REQUESTS_PER_MINUTE: u32 = 60;

/// Build the feed collaborators the configuration asks for.
///
/// Provider calls record token usage into `usage`.
pub fn build_collaborators(
    config: &ServerConfig,
    usage: Arc<UsageTracker>,
) -> ReelResult<Collaborators> {
    let (ideas, codegen) = build_generators(config, usage)?;

    Ok(Collaborators {
        ideas,
        codegen,
        apply: build_apply_engine(config),
        sink: build_sink(config),
    })
}

fn build_generators(
    config: &ServerConfig,
    usage: Arc<UsageTracker>,
) -> ReelResult<(Arc<dyn IdeaSource>, Arc<dyn CodeGenerator>)> {
    let component = config.feed.component_name.clone();

    let backend: Arc<dyn CompletionBackend> = match config.provider {
        LlmProvider::Local => {
            tracing::info!("Using local idea catalogue and template generator");
            return Ok((
                Arc::new(LocalIdeaGenerator::new()),
                Arc::new(TemplateCodeGenerator::new(component)),
            ));
        }
        LlmProvider::OpenAI => {
            let key = required(&config.openai_api_key, "OPENAI_API_KEY")?;
            Arc::new(OpenAIChat::new(key, config.openai_model.clone()).with_usage(usage))
        }
        LlmProvider::Anthropic => {
            let key = required(&config.anthropic_api_key, "ANTHROPIC_API_KEY")?;
            Arc::new(AnthropicChat::new(key, config.anthropic_model.clone()).with_usage(usage))
        }
    };

    tracing::info!(
        provider = %config.provider,
        backend = backend.provider_name(),
        "Using LLM idea source and code generator"
    );
    Ok((
        Arc::new(LlmIdeaSource::new(backend.clone())),
        Arc::new(LlmCodeGenerator::new(backend, component)),
    ))
}

fn build_apply_engine(config: &ServerConfig) -> Arc<dyn ApplyEngine> {
    match &config.apply_api_key {
        Some(key) => {
            let client = OpenAIClient::new(key.clone(), APPLY_REQUESTS_PER_MINUTE)
                .with_base_url(config.apply_base_url.clone())
                .with_provider_name("apply");
            tracing::info!(base_url = %config.apply_base_url, model = %config.apply_model, "Using remote apply service");
            Arc::new(ChatApplyEngine::new(client, config.apply_model.clone()))
        }
        None => {
            tracing::warn!("REEL_APPLY_API_KEY not set, generated code replaces the component");
            Arc::new(ReplaceApplyEngine)
        }
    }
}

fn build_sink(config: &ServerConfig) -> Arc<dyn DeploySink> {
    match &config.site_root {
        Some(root) => {
            tracing::info!(root = %root.display(), "Deploying into site directory");
            Arc::new(DirectorySink::new(root.clone()))
        }
        None => {
            tracing::info!("REEL_SITE_ROOT not set, deploys stay in memory");
            Arc::new(MemorySink::new())
        }
    }
}

fn required(value: &Option<String>, field: &str) -> ReelResult<String> {
    value.clone().ok_or_else(|| {
        ReelError::Config(ConfigError::MissingRequired {
            field: field.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_wiring() {
        let config = ServerConfig::default();
        let collaborators = build_collaborators(&config, Arc::new(UsageTracker::new())).unwrap();

        assert_eq!(collaborators.ideas.name(), "local");
        assert_eq!(collaborators.apply.name(), "replace");
    }

    #[test]
    fn test_remote_apply_when_key_present() {
        let config = ServerConfig {
            apply_api_key: Some("morph-key".to_string()),
            ..ServerConfig::default()
        };
        let collaborators = build_collaborators(&config, Arc::new(UsageTracker::new())).unwrap();
        assert_ne!(collaborators.apply.name(), "replace");
    }

    #[test]
    fn test_provider_without_key_fails() {
        let config = ServerConfig {
            provider: LlmProvider::Anthropic,
            ..ServerConfig::default()
        };
        let result = build_collaborators(&config, Arc::new(UsageTracker::new()));
        assert!(matches!(
            result,
            Err(ReelError::Config(ConfigError::MissingRequired { .. }))
        ));
    }

    #[test]
    fn test_openai_wiring() {
        let config = ServerConfig {
            provider: LlmProvider::OpenAI,
            openai_api_key: Some("sk-test".to_string()),
            ..ServerConfig::default()
        };
        let collaborators = build_collaborators(&config, Arc::new(UsageTracker::new())).unwrap();
        assert_ne!(collaborators.ideas.name(), "local");
    }
}
