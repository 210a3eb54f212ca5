//! Bounded prefetch queue.

use crate::ArtifactProducer;
use futures_util::stream::{self, StreamExt};
use reel_core::{Artifact, Idea, Readiness, ReelError, ReelResult};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of one `fill_to_target` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    /// Target after clamping to capacity
    pub target: usize,
    /// Pipeline runs started
    pub requested: usize,
    /// Artifacts added to the queue
    pub enqueued: usize,
    /// Runs that failed and were dropped
    pub failed: usize,
    /// Artifacts dropped because an overlapping fill filled the queue first
    pub rejected: usize,
}

impl FillReport {
    /// True when every requested run ended up in the queue.
    pub fn is_complete(&self) -> bool {
        self.enqueued == self.requested
    }
}

/// FIFO of ready-to-deploy artifacts, capacity fixed at construction.
///
/// Every mutation happens under one lock, so concurrent enqueue and dequeue
/// never lose or duplicate an artifact and `len() <= capacity()` always
/// holds between operations.
#[derive(Debug)]
pub struct PrefetchQueue {
    capacity: usize,
    items: Mutex<VecDeque<Artifact>>,
}

impl PrefetchQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    // A panic while holding the lock cannot leave the deque half-mutated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Artifact>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append at the tail. Fails with `CapacityExceeded` when full.
    pub fn enqueue(&self, artifact: Artifact) -> ReelResult<()> {
        let mut items = self.lock();
        if items.len() >= self.capacity {
            return Err(ReelError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        items.push_back(artifact);
        Ok(())
    }

    /// Remove and return the head, or `None` when empty.
    pub fn dequeue_head(&self) -> Option<Artifact> {
        self.lock().pop_front()
    }

    /// Snapshot of what a scroll would get right now.
    pub fn peek_readiness(&self) -> Readiness {
        let items = self.lock();
        Readiness {
            has_next: !items.is_empty(),
            count: items.len(),
            sample_idea: items.front().map(|a| a.idea().clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queued ideas, head first.
    pub fn ideas(&self) -> Vec<Idea> {
        self.lock().iter().map(|a| a.idea().clone()).collect()
    }

    /// Discard every queued artifact. Returns how many were dropped.
    pub fn reset(&self) -> usize {
        let mut items = self.lock();
        let dropped = items.len();
        items.clear();
        dropped
    }

    /// Top the queue up toward `target` (clamped to capacity).
    ///
    /// Starts `target - len` pipeline runs, at most `concurrency` at a time,
    /// and enqueues each success as it completes. Only the first run is
    /// seeded with `idea_hint`. Failed runs are logged and dropped without
    /// retry, so the queue may end short of the target.
    pub async fn fill_to_target(
        &self,
        producer: &dyn ArtifactProducer,
        target: usize,
        idea_hint: Option<Idea>,
        concurrency: usize,
    ) -> FillReport {
        let target = target.min(self.capacity);
        let remaining = target.saturating_sub(self.len());

        let mut report = FillReport {
            target,
            requested: remaining,
            ..FillReport::default()
        };

        if remaining == 0 {
            tracing::debug!(target, "Prefetch queue already at target");
            return report;
        }

        tracing::debug!(target, remaining, concurrency, "Filling prefetch queue");

        let mut hint = idea_hint;
        let mut runs = stream::iter((0..remaining).map(|_| producer.produce(hint.take())))
            .buffer_unordered(concurrency.max(1));

        while let Some(result) = runs.next().await {
            let artifact = match result {
                Ok(artifact) => artifact,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(error = %e, kind = e.kind(), "Prefetch run failed, dropping");
                    continue;
                }
            };

            let artifact_id = artifact.id();
            match self.enqueue(artifact) {
                Ok(()) => {
                    report.enqueued += 1;
                    tracing::debug!(%artifact_id, queue_len = self.len(), "Prefetched artifact queued");
                }
                Err(e) => {
                    report.rejected += 1;
                    tracing::error!(%artifact_id, error = %e, "Prefetch overflow, dropping artifact");
                }
            }
        }

        tracing::info!(
            target = report.target,
            requested = report.requested,
            enqueued = report.enqueued,
            failed = report.failed,
            rejected = report.rejected,
            queue_len = self.len(),
            "Prefetch fill completed"
        );

        report
    }
}
