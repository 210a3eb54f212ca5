//! Reel Test Utilities
//!
//! Shared test infrastructure for the Reel workspace:
//! - Scripted fakes for every collaborator trait, with call counters,
//!   failure injection and gates
//! - Proptest generators
//! - Fixtures for common scenarios
//! - Contract assertions

// Re-export the in-memory sink from its source crate
pub use reel_deploy::MemorySink;

pub use reel_core::{
    ApplyError, Artifact, FeedConfig, Idea, LlmError, ReelError, ReelResult,
};
pub use reel_deploy::{ApplyEngine, ComponentContract, DeploySink};
pub use reel_llm::{CodeGenerator, IdeaSource};

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

// ============================================================================
// GATE
// ============================================================================

/// Holds fake calls until the test releases them.
///
/// Starts closed. Each `release(n)` lets `n` waiting or future calls through.
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    pub fn closed() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `n` calls through.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    /// Let every call through from now on.
    pub fn open(&self) {
        self.permits.close();
    }

    /// Wait until the gate lets this call through.
    pub async fn pass(&self) {
        // A closed semaphore means the gate is open for good.
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

// ============================================================================
// SCRIPTED IDEA SOURCE
// ============================================================================

/// Idea source cycling through a fixed list, or failing on demand.
#[derive(Debug)]
pub struct ScriptedIdeaSource {
    ideas: Vec<Idea>,
    cursor: AtomicUsize,
    calls: AtomicUsize,
    fail: bool,
}

impl ScriptedIdeaSource {
    /// Cycle through `ideas` in order.
    pub fn new<I, S>(ideas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Idea>,
    {
        let ideas: Vec<Idea> = ideas.into_iter().map(Into::into).collect();
        Self {
            ideas: if ideas.is_empty() {
                vec![Idea::from("Scripted Game")]
            } else {
                ideas
            },
            cursor: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Source that is always unavailable.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::<Idea>::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdeaSource for ScriptedIdeaSource {
    async fn next_idea(&self) -> ReelResult<Idea> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ReelError::IdeaSourceUnavailable {
                reason: "scripted outage".to_string(),
            });
        }
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst) % self.ideas.len();
        Ok(self.ideas[idx].clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// SCRIPTED CODE GENERATOR
// ============================================================================

/// Code generator emitting a compliant component per idea.
///
/// Failures can be injected for the next `n` calls, for specific ideas, or
/// for every call. An optional [`Gate`] holds calls after they are counted.
#[derive(Debug, Default)]
pub struct ScriptedCodeGenerator {
    calls: AtomicUsize,
    fail_next: AtomicUsize,
    fail_always: bool,
    fail_ideas: Mutex<HashSet<String>>,
    output: Option<String>,
    gate: Option<Gate>,
    seen: Mutex<Vec<Idea>>,
}

impl ScriptedCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with an LLM error.
    pub fn failing() -> Self {
        Self {
            fail_always: true,
            ..Self::default()
        }
    }

    /// Return `output` verbatim instead of the generated component.
    pub fn returning(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::default()
        }
    }

    /// Hold calls at `gate` until released.
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Fail the next `n` calls.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Fail every call for `idea`.
    pub fn fail_for(&self, idea: &str) {
        self.fail_ideas
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(idea.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ideas received, in call order.
    pub fn seen(&self) -> Vec<Idea> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn should_fail(&self, idea: &Idea) -> bool {
        if self.fail_always {
            return true;
        }
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        consumed
            || self
                .fail_ideas
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(idea.as_str())
    }
}

#[async_trait]
impl CodeGenerator for ScriptedCodeGenerator {
    async fn generate(&self, idea: &Idea) -> ReelResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(idea.clone());

        if let Some(gate) = &self.gate {
            gate.pass().await;
        }

        if self.should_fail(idea) {
            return Err(ReelError::Llm(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                status: 500,
                message: format!("scripted failure for {}", idea),
            }));
        }

        Ok(match &self.output {
            Some(output) => output.clone(),
            None => fixtures::component_for(idea),
        })
    }
}

// ============================================================================
// COUNTING APPLY ENGINE
// ============================================================================

/// Recorded arguments of one apply call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyCall {
    pub current: String,
    pub instruction: String,
    pub update: String,
}

/// Apply engine returning the update verbatim and recording every call.
#[derive(Debug, Default)]
pub struct CountingApplyEngine {
    calls: Mutex<Vec<ApplyCall>>,
    fail: bool,
    output: Option<String>,
}

impl CountingApplyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a service error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Return `output` regardless of input.
    pub fn returning(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn calls(&self) -> Vec<ApplyCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ApplyEngine for CountingApplyEngine {
    async fn apply(&self, current: &str, instruction: &str, update: &str) -> ReelResult<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ApplyCall {
                current: current.to_string(),
                instruction: instruction.to_string(),
                update: update.to_string(),
            });

        if self.fail {
            return Err(ReelError::ApplyFailed(ApplyError::Service {
                reason: "scripted apply outage".to_string(),
            }));
        }

        Ok(self.output.clone().unwrap_or_else(|| update.to_string()))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Reel types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a short game idea.
    pub fn arb_idea() -> impl Strategy<Value = Idea> {
        "[A-Z][a-z]{2,8}( [A-Z][a-z]{2,8}){0,2}".prop_map(Idea::new)
    }

    /// Generate a queue capacity.
    pub fn arb_capacity() -> impl Strategy<Value = usize> {
        1usize..=8
    }

    /// One step against a prefetch queue.
    #[derive(Debug, Clone)]
    pub enum QueueOp {
        Enqueue(Idea),
        Dequeue,
        Reset,
    }

    /// Generate a queue operation, weighted toward enqueue and dequeue.
    pub fn arb_queue_op() -> impl Strategy<Value = QueueOp> {
        prop_oneof![
            5 => arb_idea().prop_map(QueueOp::Enqueue),
            4 => Just(QueueOp::Dequeue),
            1 => Just(QueueOp::Reset),
        ]
    }

    /// Generate a sequence of queue operations.
    pub fn arb_queue_ops(max_len: usize) -> impl Strategy<Value = Vec<QueueOp>> {
        prop::collection::vec(arb_queue_op(), 0..max_len)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// A contract-compliant GameZone component mentioning `idea`.
    pub fn component_for(idea: &Idea) -> String {
        format!(
            "import React, {{ useState }} from 'react';\n\n\
             const GameZone = () => {{\n  \
             const [score, setScore] = useState(0);\n  \
             return <button onClick={{() => setScore(score + 1)}}>{} {{score}}</button>;\n\
             }};\n\n\
             export default GameZone;",
            idea
        )
    }

    /// Artifact whose payload is [`component_for`] its idea.
    pub fn artifact(idea: &str) -> Artifact {
        let idea = Idea::from(idea);
        let payload = component_for(&idea);
        Artifact::new(idea, payload)
    }

    /// Feed config with the given capacity and serial fills.
    pub fn feed_config(capacity: usize) -> FeedConfig {
        FeedConfig {
            queue_capacity: capacity,
            fill_concurrency: 1,
            ..FeedConfig::default()
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Reel-specific validation.

    use super::*;

    /// Assert `content` satisfies the component contract for `name`.
    pub fn assert_component_compliant(content: &str, name: &str) {
        let contract = ComponentContract::new(name).expect("valid component name");
        assert!(
            contract.is_compliant(content),
            "content does not satisfy the {} contract:\n{}",
            name,
            content
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
