//! End-to-end scroll scenarios against scripted collaborators.

use async_trait::async_trait;
use reel_core::{
    ApplyError, ArtifactSource, CoordinatorState, Idea, ReelError, ReelResult, SinkError,
    DEFAULT_TARGET_PATH,
};
use reel_deploy::DeploySink;
use reel_feed::{Collaborators, NextOutcome, Pipeline, ScrollCoordinator};
use reel_test_utils::assertions::assert_component_compliant;
use reel_test_utils::{
    fixtures, CountingApplyEngine, Gate, MemorySink, ScriptedCodeGenerator, ScriptedIdeaSource,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    ideas: Arc<ScriptedIdeaSource>,
    codegen: Arc<ScriptedCodeGenerator>,
    apply: Arc<CountingApplyEngine>,
    sink: Arc<MemorySink>,
    coordinator: Arc<ScrollCoordinator>,
}

impl Harness {
    fn new(capacity: usize) -> Self {
        Self::build(
            ScriptedIdeaSource::new(["Moon Hopper", "Gravity Golf"]),
            ScriptedCodeGenerator::new(),
            CountingApplyEngine::new(),
            capacity,
        )
    }

    fn build(
        ideas: ScriptedIdeaSource,
        codegen: ScriptedCodeGenerator,
        apply: CountingApplyEngine,
        capacity: usize,
    ) -> Self {
        let ideas = Arc::new(ideas);
        let codegen = Arc::new(codegen);
        let apply = Arc::new(apply);
        let sink = Arc::new(MemorySink::new());

        let coordinator = ScrollCoordinator::from_collaborators(
            Collaborators {
                ideas: ideas.clone(),
                codegen: codegen.clone(),
                apply: apply.clone(),
                sink: sink.clone(),
            },
            fixtures::feed_config(capacity),
        )
        .unwrap();

        Self {
            ideas,
            codegen,
            apply,
            sink,
            coordinator: Arc::new(coordinator),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            ideas: self.ideas.clone(),
            codegen: self.codegen.clone(),
            apply: self.apply.clone(),
            sink: self.sink.clone(),
        }
    }

    fn seed(&self, ideas: &[&str]) {
        for idea in ideas {
            self.coordinator
                .queue()
                .enqueue(fixtures::artifact(idea))
                .unwrap();
        }
    }

    fn deployed(&self) -> String {
        self.sink.contents(DEFAULT_TARGET_PATH).unwrap_or_default()
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    while !done() {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// SERVING
// ============================================================================

#[tokio::test]
async fn test_hit_deploys_head_and_refills() {
    let h = Harness::new(5);
    h.seed(&["Neon Racer", "Pixel Pirates"]);

    let outcome = h.coordinator.next().await.unwrap();

    match &outcome {
        NextOutcome::Served {
            idea,
            source,
            queue_remaining,
            ..
        } => {
            assert_eq!(idea.as_str(), "Neon Racer");
            assert_eq!(*source, ArtifactSource::Prefetched);
            assert_eq!(*queue_remaining, 1);
        }
        other => panic!("expected served, got {:?}", other),
    }
    assert!(h.deployed().contains("Neon Racer"));

    let reports = h.coordinator.drain().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].requested, 4);
    // every pipeline run belongs to the refill
    assert_eq!(h.codegen.calls(), 4);
    assert_eq!(h.coordinator.queue().len(), 5);
    // refill appends behind what was already queued
    assert_eq!(h.coordinator.queue().ideas()[0].as_str(), "Pixel Pirates");
}

#[tokio::test]
async fn test_miss_runs_pipeline_once_then_refills() {
    let h = Harness::new(5);

    let outcome = h.coordinator.next().await.unwrap();

    assert!(matches!(
        outcome,
        NextOutcome::Served {
            source: ArtifactSource::Generated,
            ..
        }
    ));
    assert_eq!(h.sink.write_count(), 1);
    assert_component_compliant(&h.deployed(), "GameZone");
    assert!(h.deployed().contains("Moon Hopper"));

    let refilled: usize = h.coordinator.drain().await.iter().map(|r| r.requested).sum();
    assert_eq!(refilled, 5);
    assert_eq!(h.ideas.calls(), 1 + refilled);
    assert_eq!(h.codegen.calls(), 1 + refilled);
    assert_eq!(h.apply.call_count(), 1 + refilled);
    assert_eq!(h.sink.write_count(), 1);
    assert_eq!(h.coordinator.queue().len(), 5);
    assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
}

#[tokio::test]
async fn test_scrolling_drains_then_falls_back() {
    // refills wait at the gate, so scrolling outpaces them
    let gate = Gate::closed();
    let h = Harness::build(
        ScriptedIdeaSource::new(["Moon Hopper"]),
        ScriptedCodeGenerator::new().gated(gate.clone()),
        CountingApplyEngine::new(),
        2,
    );
    h.seed(&["a", "b"]);

    for _ in 0..2 {
        let outcome = h.coordinator.next().await.unwrap();
        assert!(matches!(
            outcome,
            NextOutcome::Served {
                source: ArtifactSource::Prefetched,
                ..
            }
        ));
    }
    assert!(h.coordinator.queue().is_empty());

    let third = {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move { coordinator.next().await })
    };
    wait_until(|| h.coordinator.state() == CoordinatorState::FallbackGenerating).await;

    gate.open();
    let outcome = third.await.unwrap().unwrap();
    assert!(matches!(
        outcome,
        NextOutcome::Served {
            source: ArtifactSource::Generated,
            ..
        }
    ));

    let metrics = h.coordinator.metrics();
    assert_eq!(metrics.served_prefetched, 2);
    assert_eq!(metrics.served_generated, 1);
    h.coordinator.drain().await;
}

// ============================================================================
// SINGLE FLIGHT
// ============================================================================

#[tokio::test]
async fn test_second_next_during_fallback_is_ignored() {
    let gate = Gate::closed();
    let h = Harness::build(
        ScriptedIdeaSource::new(["Neon Racer"]),
        ScriptedCodeGenerator::new().gated(gate.clone()),
        CountingApplyEngine::new(),
        3,
    );

    let first = {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move { coordinator.next().await })
    };
    wait_until(|| h.codegen.calls() == 1).await;
    assert_eq!(h.coordinator.state(), CoordinatorState::FallbackGenerating);

    let second = h.coordinator.next().await.unwrap();
    assert_eq!(
        second,
        NextOutcome::Ignored {
            state: CoordinatorState::FallbackGenerating
        }
    );

    gate.release(1);
    let first = first.await.unwrap().unwrap();
    assert!(first.is_served());
    assert_eq!(h.sink.write_count(), 1);
    assert_eq!(h.coordinator.metrics().ignored, 1);
    assert_eq!(h.coordinator.metrics().served_generated, 1);

    gate.open();
    h.coordinator.drain().await;
    assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
}

/// Sink whose writes wait at a gate.
struct GatedSink {
    inner: MemorySink,
    gate: Gate,
}

#[async_trait]
impl DeploySink for GatedSink {
    async fn read(&self, path: &str) -> ReelResult<Option<String>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, content: &str) -> ReelResult<()> {
        self.gate.pass().await;
        self.inner.write(path, content).await
    }
}

/// Coordinator over a gated sink, seeded with `seed`.
fn gated_sink_coordinator(
    sink_gate: &Gate,
    codegen: ScriptedCodeGenerator,
    seed: &[&str],
) -> (Arc<ScrollCoordinator>, Arc<GatedSink>) {
    let sink = Arc::new(GatedSink {
        inner: MemorySink::new(),
        gate: sink_gate.clone(),
    });
    let coordinator = ScrollCoordinator::from_collaborators(
        Collaborators {
            ideas: Arc::new(ScriptedIdeaSource::new(["Moon Hopper"])),
            codegen: Arc::new(codegen),
            apply: Arc::new(CountingApplyEngine::new()),
            sink: sink.clone(),
        },
        fixtures::feed_config(5),
    )
    .unwrap();
    for idea in seed {
        coordinator.queue().enqueue(fixtures::artifact(idea)).unwrap();
    }
    (Arc::new(coordinator), sink)
}

#[tokio::test]
async fn test_second_next_during_deploy_consumes_nothing() {
    let gate = Gate::closed();
    let fill_gate = Gate::closed();
    let (coordinator, sink) = gated_sink_coordinator(
        &gate,
        ScriptedCodeGenerator::new().gated(fill_gate.clone()),
        &["Neon Racer", "Pixel Pirates"],
    );

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.next().await })
    };
    wait_until(|| coordinator.queue().len() == 1).await;
    assert_eq!(coordinator.state(), CoordinatorState::Serving);
    // the refill is already scheduled while the deploy is pending
    assert_eq!(coordinator.fills_in_flight(), 1);

    let second = coordinator.next().await.unwrap();
    assert_eq!(
        second,
        NextOutcome::Ignored {
            state: CoordinatorState::Serving
        }
    );
    assert_eq!(coordinator.queue().ideas(), vec![Idea::from("Pixel Pirates")]);

    gate.open();
    match first.await.unwrap().unwrap() {
        NextOutcome::Served { idea, .. } => assert_eq!(idea.as_str(), "Neon Racer"),
        other => panic!("expected served, got {:?}", other),
    }
    assert_eq!(sink.inner.write_count(), 1);

    fill_gate.open();
    coordinator.drain().await;
    assert_eq!(coordinator.queue().len(), 5);
}

// ============================================================================
// ABANDONED CALLERS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_timed_out_hit_still_deploys_and_refills() {
    let gate = Gate::closed();
    let (coordinator, sink) =
        gated_sink_coordinator(&gate, ScriptedCodeGenerator::new(), &["Neon Racer", "Pixel Pirates"]);

    let result = tokio::time::timeout(Duration::from_millis(20), coordinator.next()).await;
    assert!(result.is_err());

    // the serve task holds the gate and the popped head
    assert_eq!(coordinator.state(), CoordinatorState::Serving);
    assert!(!coordinator
        .queue()
        .ideas()
        .contains(&Idea::from("Neon Racer")));
    assert_eq!(
        coordinator.next().await.unwrap(),
        NextOutcome::Ignored {
            state: CoordinatorState::Serving
        }
    );

    gate.open();
    wait_until(|| {
        sink.inner.write_count() == 1 && coordinator.state() == CoordinatorState::Idle
    })
    .await;
    assert!(sink
        .inner
        .contents(DEFAULT_TARGET_PATH)
        .unwrap()
        .contains("Neon Racer"));
    assert_eq!(coordinator.metrics().served_prefetched, 1);

    coordinator.drain().await;
    assert!(coordinator.metrics().fills >= 1);
    assert_eq!(coordinator.queue().len(), 5);
    assert_eq!(coordinator.queue().ideas()[0].as_str(), "Pixel Pirates");
}

#[tokio::test(start_paused = true)]
async fn test_dropped_fallback_still_deploys() {
    let sink_gate = Gate::closed();
    sink_gate.open();
    let codegen_gate = Gate::closed();
    let (coordinator, sink) = gated_sink_coordinator(
        &sink_gate,
        ScriptedCodeGenerator::new().gated(codegen_gate.clone()),
        &[],
    );

    let result = tokio::time::timeout(Duration::from_millis(20), coordinator.next()).await;
    assert!(result.is_err());
    assert_eq!(coordinator.state(), CoordinatorState::FallbackGenerating);

    codegen_gate.open();
    wait_until(|| {
        sink.inner.write_count() == 1 && coordinator.state() == CoordinatorState::Idle
    })
    .await;
    assert!(sink
        .inner
        .contents(DEFAULT_TARGET_PATH)
        .unwrap()
        .contains("Moon Hopper"));
    assert_eq!(coordinator.metrics().served_generated, 1);

    coordinator.drain().await;
    assert_eq!(coordinator.queue().len(), 5);
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_codegen_failure_surfaces_and_leaves_queue_alone() {
    let h = Harness::build(
        ScriptedIdeaSource::new(["Neon Racer"]),
        ScriptedCodeGenerator::failing(),
        CountingApplyEngine::new(),
        5,
    );

    let result = h.coordinator.next().await;

    assert!(matches!(result, Err(ReelError::GenerationFailed { .. })));
    assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
    assert!(h.coordinator.queue().is_empty());
    assert_eq!(h.coordinator.fills_in_flight(), 0);
    assert_eq!(h.sink.write_count(), 0);
    assert_eq!(h.coordinator.metrics().failures, 1);

    // the gate is open again
    assert!(h.coordinator.next().await.is_err());
    assert_eq!(h.coordinator.metrics().ignored, 0);
}

#[tokio::test]
async fn test_apply_failure_surfaces_as_apply_failed() {
    let h = Harness::build(
        ScriptedIdeaSource::new(["Neon Racer"]),
        ScriptedCodeGenerator::new(),
        CountingApplyEngine::failing(),
        5,
    );

    assert!(matches!(
        h.coordinator.next().await,
        Err(ReelError::ApplyFailed(ApplyError::Service { .. }))
    ));
    assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
}

#[tokio::test]
async fn test_failed_hit_deploy_consumes_head_and_refills() {
    let h = Harness::new(3);
    h.seed(&["Neon Racer", "Pixel Pirates"]);
    h.sink.set_fail_writes(true);

    let result = h.coordinator.next().await;

    assert!(matches!(
        result,
        Err(ReelError::DeploySink(SinkError::WriteFailed { .. }))
    ));
    assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
    assert_eq!(h.coordinator.metrics().failures, 1);

    let reports = h.coordinator.drain().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(h.coordinator.queue().len(), 3);
    // the failed head is gone, the next one is still first
    assert_eq!(h.coordinator.queue().ideas()[0].as_str(), "Pixel Pirates");
}

#[tokio::test]
async fn test_idea_outage_still_serves() {
    let h = Harness::build(
        ScriptedIdeaSource::failing(),
        ScriptedCodeGenerator::new(),
        CountingApplyEngine::new(),
        2,
    );

    let outcome = h.coordinator.next().await.unwrap();

    assert!(outcome.is_served());
    assert_component_compliant(&h.deployed(), "GameZone");

    let refilled: usize = h.coordinator.drain().await.iter().map(|r| r.requested).sum();
    assert_eq!(h.ideas.calls(), 1 + refilled);
    assert_eq!(h.coordinator.queue().len(), 2);
}

// ============================================================================
// FILLING
// ============================================================================

#[tokio::test]
async fn test_fill_with_failures_enqueues_only_good_artifacts() {
    let h = Harness::new(5);
    let pipeline = Pipeline::new(h.collaborators(), fixtures::feed_config(5)).unwrap();
    h.codegen.fail_next(2);

    let report = h
        .coordinator
        .queue()
        .fill_to_target(&pipeline, 5, None, 2)
        .await;

    assert_eq!(report.failed, 2);
    assert_eq!(report.enqueued, 3);
    assert_eq!(h.coordinator.queue().len(), 3);
    while let Some(artifact) = h.coordinator.queue().dequeue_head() {
        assert_component_compliant(artifact.payload(), "GameZone");
    }
}

#[tokio::test]
async fn test_prefetch_with_hint_seeds_first_artifact() {
    let h = Harness::new(3);

    h.coordinator.prefetch(None, Some(Idea::from("Neon Racer")));
    h.coordinator.drain().await;

    assert_eq!(h.coordinator.queue().len(), 3);
    assert_eq!(h.codegen.seen()[0].as_str(), "Neon Racer");
    assert_eq!(
        h.coordinator.readiness().sample_idea,
        Some(Idea::from("Neon Racer"))
    );
}

#[tokio::test]
async fn test_reset_queue_then_next_generates() {
    let h = Harness::new(3);
    h.seed(&["a", "b", "c"]);

    assert_eq!(h.coordinator.reset_queue(), 3);
    assert!(!h.coordinator.readiness().has_next);

    let outcome = h.coordinator.next().await.unwrap();
    assert!(matches!(
        outcome,
        NextOutcome::Served {
            source: ArtifactSource::Generated,
            ..
        }
    ));
    h.coordinator.drain().await;
}
