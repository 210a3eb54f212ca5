//! Scroll coordinator: the single consumer entry point.
//!
//! ```text
//! Idle --next()--> Serving --hit--> deploy --> Idle (+ background fill)
//!                     |
//!                    miss
//!                     v
//!            FallbackGenerating --produce, deploy--> Idle (+ background fill)
//! ```
//!
//! A `next()` arriving while not `Idle` is ignored, never queued. Each
//! accepted call runs to completion on its own task, even if the caller
//! stops waiting.

use crate::metrics::{FeedMetrics, FeedMetricsSnapshot};
use crate::pipeline::Pipeline;
use crate::queue::{FillReport, PrefetchQueue};
use crate::replenish::Replenisher;
use crate::{ArtifactProducer, Collaborators};
use reel_core::{
    Artifact, ArtifactId, ArtifactSource, CoordinatorState, FeedConfig, Idea, Readiness,
    ReelError, ReelResult,
};
use reel_deploy::DeploySink;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Result of a `next()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NextOutcome {
    /// A game was deployed.
    Served {
        artifact_id: ArtifactId,
        idea: Idea,
        source: ArtifactSource,
        queue_remaining: usize,
    },
    /// Another `next()` was in flight; nothing happened.
    Ignored { state: CoordinatorState },
}

impl NextOutcome {
    pub fn is_served(&self) -> bool {
        matches!(self, Self::Served { .. })
    }
}

/// Returns the gate to `Idle` however the holder exits.
///
/// Owned by the spawned serve task, so the gate only reopens once the task
/// itself is done.
struct StateGuard {
    shared: Arc<Shared>,
}

impl StateGuard {
    fn set(&self, state: CoordinatorState) {
        self.shared.state.store(state as u8, Ordering::Release);
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        self.shared
            .state
            .store(CoordinatorState::Idle as u8, Ordering::Release);
    }
}

/// State reachable from detached serve tasks.
struct Shared {
    state: AtomicU8,
    queue: Arc<PrefetchQueue>,
    producer: Arc<dyn ArtifactProducer>,
    sink: Arc<dyn DeploySink>,
    replenisher: Replenisher,
    target_path: String,
    metrics: Arc<FeedMetrics>,
}

/// Serves scrolls from the prefetch queue, generating on a miss.
pub struct ScrollCoordinator {
    shared: Arc<Shared>,
}

impl ScrollCoordinator {
    /// Wire a coordinator around an existing queue.
    pub fn new(
        queue: Arc<PrefetchQueue>,
        producer: Arc<dyn ArtifactProducer>,
        sink: Arc<dyn DeploySink>,
        config: &FeedConfig,
    ) -> Self {
        let metrics = Arc::new(FeedMetrics::new());
        let replenisher = Replenisher::new(
            queue.clone(),
            producer.clone(),
            config.fill_concurrency,
            metrics.clone(),
        );

        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(CoordinatorState::Idle as u8),
                queue,
                producer,
                sink,
                replenisher,
                target_path: config.target_path.clone(),
                metrics,
            }),
        }
    }

    /// Build the queue and pipeline from collaborators and config.
    pub fn from_collaborators(collaborators: Collaborators, config: FeedConfig) -> ReelResult<Self> {
        let queue = Arc::new(PrefetchQueue::new(config.queue_capacity));
        let sink = collaborators.sink.clone();
        let pipeline = Pipeline::new(collaborators, config.clone())?;
        Ok(Self::new(queue, Arc::new(pipeline), sink, &config))
    }

    pub fn state(&self) -> CoordinatorState {
        CoordinatorState::from(self.shared.state.load(Ordering::Acquire))
    }

    pub fn readiness(&self) -> Readiness {
        self.shared.queue.peek_readiness()
    }

    pub fn queue(&self) -> &Arc<PrefetchQueue> {
        &self.shared.queue
    }

    pub fn metrics(&self) -> FeedMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Deploy the next game.
    ///
    /// Pops the queue head when there is one, otherwise generates
    /// synchronously. A hit schedules the background refill as soon as the
    /// head is popped; a miss schedules it after a successful deploy.
    /// Concurrent calls while one is in flight return `Ignored`.
    ///
    /// The work runs on its own task. Dropping the returned future does not
    /// stop it: a popped artifact is still deployed and the refill still
    /// scheduled.
    pub async fn next(&self) -> ReelResult<NextOutcome> {
        let guard = match self.acquire() {
            Ok(guard) => guard,
            Err(state) => return Ok(NextOutcome::Ignored { state }),
        };

        join_serve(tokio::spawn(async move {
            let shared = guard.shared.clone();
            let outcome = match shared.queue.dequeue_head() {
                Some(artifact) => shared.serve_prefetched(artifact).await,
                None => {
                    guard.set(CoordinatorState::FallbackGenerating);
                    tracing::info!("Prefetch queue empty, generating synchronously");
                    shared.serve_generated().await
                }
            };
            drop(guard);
            outcome
        }))
        .await
    }

    /// Generate and deploy a game for `idea`, bypassing the queue.
    ///
    /// Shares the `next()` gate: while a scroll is in flight this returns
    /// `Ignored`. The queue is neither read nor refilled.
    pub async fn deploy_idea(&self, idea: Idea) -> ReelResult<NextOutcome> {
        let guard = match self.acquire() {
            Ok(guard) => guard,
            Err(state) => return Ok(NextOutcome::Ignored { state }),
        };

        join_serve(tokio::spawn(async move {
            guard.set(CoordinatorState::FallbackGenerating);
            let shared = guard.shared.clone();
            tracing::info!(idea = %idea, "Generating requested game");
            let outcome = shared.serve_requested(idea).await;
            drop(guard);
            outcome
        }))
        .await
    }

    fn acquire(&self) -> Result<StateGuard, CoordinatorState> {
        match self.shared.state.compare_exchange(
            CoordinatorState::Idle as u8,
            CoordinatorState::Serving as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(StateGuard {
                shared: self.shared.clone(),
            }),
            Err(current) => {
                let state = CoordinatorState::from(current);
                self.shared.metrics.ignored.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%state, "Scroll ignored, previous one still in flight");
                Err(state)
            }
        }
    }

    /// Schedule a background fill. `target` defaults to capacity and is
    /// clamped to it. Returns the effective target.
    pub fn prefetch(&self, target: Option<usize>, idea_hint: Option<Idea>) -> usize {
        let capacity = self.shared.queue.capacity();
        let target = target.unwrap_or(capacity).min(capacity);
        self.shared.replenisher.schedule(target, idea_hint);
        target
    }

    /// Discard every queued artifact. Returns how many were dropped.
    pub fn reset_queue(&self) -> usize {
        let dropped = self.shared.queue.reset();
        tracing::info!(dropped, "Prefetch queue reset");
        dropped
    }

    /// Currently deployed component, if any.
    pub async fn current_content(&self) -> ReelResult<Option<String>> {
        self.shared.sink.read(&self.shared.target_path).await
    }

    /// Overwrite the deployed component directly, bypassing the queue.
    pub async fn write_content(&self, content: &str) -> ReelResult<()> {
        self.shared
            .sink
            .write(&self.shared.target_path, content)
            .await?;
        tracing::info!(bytes = content.len(), path = %self.shared.target_path, "Deployed component overwritten");
        Ok(())
    }

    /// Background fills still running.
    pub fn fills_in_flight(&self) -> usize {
        self.shared.replenisher.in_flight()
    }

    /// Wait for all background fills to finish.
    pub async fn drain(&self) -> Vec<FillReport> {
        self.shared.replenisher.drain().await
    }
}

/// Await a serve task, re-raising its panic if it had one.
async fn join_serve(handle: JoinHandle<ReelResult<NextOutcome>>) -> ReelResult<NextOutcome> {
    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(ReelError::Interrupted {
            reason: e.to_string(),
        }),
    }
}

impl Shared {
    async fn serve_prefetched(&self, artifact: Artifact) -> ReelResult<NextOutcome> {
        // The popped artifact is consumed even when the deploy fails.
        self.replenisher.schedule(self.queue.capacity(), None);

        if let Err(e) = self.deploy(&artifact).await {
            self.metrics.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(artifact_id = %artifact.id(), error = %e, "Deploy of prefetched artifact failed");
            return Err(e);
        }

        self.metrics.served_prefetched.fetch_add(1, Ordering::Relaxed);
        Ok(self.served(artifact, ArtifactSource::Prefetched))
    }

    async fn serve_generated(&self) -> ReelResult<NextOutcome> {
        let artifact = match self.produce_and_deploy(None).await {
            Ok(artifact) => artifact,
            Err(e) => {
                self.metrics.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(kind = e.kind(), error = %e, "Fallback generation failed");
                return Err(e);
            }
        };

        self.replenisher.schedule(self.queue.capacity(), None);
        self.metrics.served_generated.fetch_add(1, Ordering::Relaxed);
        Ok(self.served(artifact, ArtifactSource::Generated))
    }

    async fn serve_requested(&self, idea: Idea) -> ReelResult<NextOutcome> {
        let artifact = match self.produce_and_deploy(Some(idea)).await {
            Ok(artifact) => artifact,
            Err(e) => {
                self.metrics.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(kind = e.kind(), error = %e, "Requested generation failed");
                return Err(e);
            }
        };

        self.metrics.served_requested.fetch_add(1, Ordering::Relaxed);
        Ok(self.served(artifact, ArtifactSource::Requested))
    }

    async fn produce_and_deploy(&self, idea: Option<Idea>) -> ReelResult<Artifact> {
        let artifact = self.producer.produce(idea).await?;
        self.deploy(&artifact).await?;
        Ok(artifact)
    }

    async fn deploy(&self, artifact: &Artifact) -> ReelResult<()> {
        self.sink.write(&self.target_path, artifact.payload()).await
    }

    fn served(&self, artifact: Artifact, source: ArtifactSource) -> NextOutcome {
        let queue_remaining = self.queue.len();
        tracing::info!(
            artifact_id = %artifact.id(),
            idea = %artifact.idea(),
            source = ?source,
            queue_remaining,
            "Served game"
        );

        let artifact_id = artifact.id();
        let (idea, _) = artifact.into_parts();
        NextOutcome::Served {
            artifact_id,
            idea,
            source,
            queue_remaining,
        }
    }
}

impl std::fmt::Debug for ScrollCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollCoordinator")
            .field("state", &self.state())
            .field("queue_len", &self.shared.queue.len())
            .field("target_path", &self.shared.target_path)
            .finish()
    }
}
