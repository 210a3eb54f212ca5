//! Single-artifact generation pipeline.
//!
//! idea → code → apply → sanitize, strictly in order, no retries. The only
//! recovered failure is an unavailable idea source, which falls back to the
//! local catalogue.

use crate::{ArtifactProducer, Collaborators};
use async_trait::async_trait;
use reel_core::{
    strip_code_fences, ApplyError, Artifact, FeedConfig, Idea, PipelineRun, PipelineStage,
    ReelError, ReelResult,
};
use reel_deploy::{scaffold, ApplyEngine, ComponentContract, DeploySink};
use reel_llm::{CodeGenerator, IdeaSource, LocalIdeaGenerator};
use std::sync::Arc;

/// Produces one deployable artifact per run.
pub struct Pipeline {
    ideas: Arc<dyn IdeaSource>,
    fallback_ideas: LocalIdeaGenerator,
    codegen: Arc<dyn CodeGenerator>,
    apply: Arc<dyn ApplyEngine>,
    sink: Arc<dyn DeploySink>,
    contract: ComponentContract,
    config: FeedConfig,
}

impl Pipeline {
    /// Build a pipeline. Fails when the config is invalid.
    pub fn new(collaborators: Collaborators, config: FeedConfig) -> ReelResult<Self> {
        config.validate()?;
        let contract = ComponentContract::new(&config.component_name)?;

        Ok(Self {
            ideas: collaborators.ideas,
            fallback_ideas: LocalIdeaGenerator::new(),
            codegen: collaborators.codegen,
            apply: collaborators.apply,
            sink: collaborators.sink,
            contract,
            config,
        })
    }

    /// Replace the local fallback idea generator.
    pub fn with_fallback_ideas(mut self, fallback: LocalIdeaGenerator) -> Self {
        self.fallback_ideas = fallback;
        self
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn DeploySink> {
        &self.sink
    }

    /// Run the pipeline and return the run record alongside the result.
    pub async fn produce_traced(&self, idea: Option<Idea>) -> (PipelineRun, ReelResult<Artifact>) {
        let mut run = PipelineRun::start(idea);
        let result = self.run_stages(&mut run).await;

        match &result {
            Ok(artifact) => {
                run.advance(PipelineStage::Done);
                tracing::info!(
                    run_id = %run.run_id,
                    artifact_id = %artifact.id(),
                    idea = %artifact.idea(),
                    elapsed_ms = (artifact.created_at() - run.started_at).num_milliseconds(),
                    "Pipeline run produced artifact"
                );
            }
            Err(e) => {
                run.fail(e.clone());
                tracing::warn!(
                    run_id = %run.run_id,
                    stage = ?run.failed_at,
                    kind = e.kind(),
                    error = %e,
                    "Pipeline run failed"
                );
            }
        }

        (run, result)
    }

    async fn run_stages(&self, run: &mut PipelineRun) -> ReelResult<Artifact> {
        let idea = match run.idea.clone() {
            Some(idea) => idea,
            None => {
                let idea = self.obtain_idea().await;
                run.idea = Some(idea.clone());
                run.advance(PipelineStage::CodegenPending);
                idea
            }
        };
        tracing::debug!(run_id = %run.run_id, idea = %idea, stage = %run.stage, "Generating code");

        let code = self.generate(&idea).await?;
        run.advance(PipelineStage::ApplyPending);
        tracing::debug!(run_id = %run.run_id, bytes = code.len(), stage = %run.stage, "Applying update");

        let current = self.current_content().await;
        let merged = self.merge(&current, &code).await?;

        let sanitized = self.contract.sanitize(&merged)?;
        if sanitized.was_patched() {
            tracing::debug!(
                run_id = %run.run_id,
                injected_import = sanitized.injected_import,
                injected_export = sanitized.injected_export,
                "Patched apply output into component shape"
            );
        }

        run.advance(PipelineStage::DeployPending);
        Ok(Artifact::new(idea, sanitized.content))
    }

    async fn obtain_idea(&self) -> Idea {
        match self.ideas.next_idea().await {
            Ok(idea) => idea,
            Err(e) => {
                let idea = self.fallback_ideas.next();
                tracing::warn!(
                    source = self.ideas.name(),
                    error = %e,
                    fallback = %idea,
                    "Idea source unavailable, using local idea"
                );
                idea
            }
        }
    }

    async fn generate(&self, idea: &Idea) -> ReelResult<String> {
        let generation_failed = |reason: String| ReelError::GenerationFailed {
            idea: idea.to_string(),
            reason,
        };

        let call = self.codegen.generate(idea);
        let result = match self.config.codegen_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(generation_failed(format!("timed out after {:?}", limit))),
            },
            None => call.await,
        };

        let code = match result {
            Ok(code) => strip_code_fences(&code),
            Err(e @ ReelError::GenerationFailed { .. }) => return Err(e),
            Err(e) => return Err(generation_failed(e.to_string())),
        };

        if code.is_empty() {
            return Err(generation_failed("code generator returned no code".to_string()));
        }
        Ok(code)
    }

    /// Currently deployed file, or the scaffold when there is none.
    async fn current_content(&self) -> String {
        match self.sink.read(&self.config.target_path).await {
            Ok(Some(content)) => content,
            Ok(None) => scaffold(&self.config.component_name),
            Err(e) => {
                tracing::warn!(
                    path = %self.config.target_path,
                    error = %e,
                    "Could not read deployed component, merging against scaffold"
                );
                scaffold(&self.config.component_name)
            }
        }
    }

    async fn merge(&self, current: &str, code: &str) -> ReelResult<String> {
        let call = self
            .apply
            .apply(current, &self.config.apply_instruction, code);

        let result = match self.config.apply_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(ApplyError::Timeout { elapsed: limit }.into()),
            },
            None => call.await,
        };

        result.map_err(|e| match e {
            ReelError::ApplyFailed(_) => e,
            other => ApplyError::Service {
                reason: other.to_string(),
            }
            .into(),
        })
    }
}

#[async_trait]
impl ArtifactProducer for Pipeline {
    async fn produce(&self, idea: Option<Idea>) -> ReelResult<Artifact> {
        self.produce_traced(idea).await.1
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("ideas", &self.ideas.name())
            .field("apply", &self.apply.name())
            .field("contract", &self.contract.name())
            .field("config", &self.config)
            .finish()
    }
}
