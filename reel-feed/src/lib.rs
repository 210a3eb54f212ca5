//! Reel Feed - Prefetch and Scroll Coordination
//!
//! Keeps a bounded queue of ready-to-deploy game artifacts topped up in the
//! background so a scroll is served from cache instead of waiting on the
//! multi-second generation pipeline.
//!
//! - [`PrefetchQueue`]: bounded FIFO of artifacts with best-effort fills
//! - [`Pipeline`]: idea, codegen, apply and sanitation for one artifact
//! - [`Replenisher`]: owns background fill tasks
//! - [`ScrollCoordinator`]: the `next()` entry point and its state gate

pub mod coordinator;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod replenish;

pub use coordinator::{NextOutcome, ScrollCoordinator};
pub use metrics::{FeedMetrics, FeedMetricsSnapshot};
pub use pipeline::Pipeline;
pub use queue::{FillReport, PrefetchQueue};
pub use replenish::Replenisher;

use async_trait::async_trait;
use reel_core::{Artifact, Idea, ReelResult};
use reel_deploy::{ApplyEngine, DeploySink};
use reel_llm::{CodeGenerator, IdeaSource};
use std::sync::Arc;

/// Produces one finished artifact per call.
///
/// [`Pipeline`] is the production implementation; the queue and coordinator
/// only see this trait.
#[async_trait]
pub trait ArtifactProducer: Send + Sync {
    /// Run one generation. `idea` skips the idea stage when given.
    async fn produce(&self, idea: Option<Idea>) -> ReelResult<Artifact>;
}

/// External services the pipeline and coordinator talk to.
#[derive(Clone)]
pub struct Collaborators {
    pub ideas: Arc<dyn IdeaSource>,
    pub codegen: Arc<dyn CodeGenerator>,
    pub apply: Arc<dyn ApplyEngine>,
    pub sink: Arc<dyn DeploySink>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("ideas", &self.ideas.name())
            .field("apply", &self.apply.name())
            .finish_non_exhaustive()
    }
}
