//! Background queue replenishment.

use crate::metrics::FeedMetrics;
use crate::queue::{FillReport, PrefetchQueue};
use crate::ArtifactProducer;
use reel_core::Idea;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{JoinError, JoinSet};

/// Owns fire-and-forget fill tasks.
///
/// Each `schedule` spawns one `fill_to_target` onto the runtime. Overlapping
/// fills are fine: each recomputes its shortfall from the queue's own length.
/// Finished tasks are reaped on every schedule; `drain` waits for the rest.
pub struct Replenisher {
    queue: Arc<PrefetchQueue>,
    producer: Arc<dyn ArtifactProducer>,
    concurrency: usize,
    metrics: Arc<FeedMetrics>,
    tasks: Mutex<JoinSet<FillReport>>,
}

impl Replenisher {
    pub fn new(
        queue: Arc<PrefetchQueue>,
        producer: Arc<dyn ArtifactProducer>,
        concurrency: usize,
        metrics: Arc<FeedMetrics>,
    ) -> Self {
        Self {
            queue,
            producer,
            concurrency: concurrency.max(1),
            metrics,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<FillReport>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a background fill toward `target`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, target: usize, idea_hint: Option<Idea>) {
        let queue = self.queue.clone();
        let producer = self.producer.clone();
        let metrics = self.metrics.clone();
        let concurrency = self.concurrency;

        let mut tasks = self.tasks();
        while let Some(finished) = tasks.try_join_next() {
            log_join(finished);
        }

        tasks.spawn(async move {
            let report = queue
                .fill_to_target(producer.as_ref(), target, idea_hint, concurrency)
                .await;
            metrics.record_fill(&report);
            report
        });

        tracing::debug!(target, in_flight = tasks.len(), "Scheduled prefetch fill");
    }

    /// Fills still running (after reaping finished ones).
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks();
        while let Some(finished) = tasks.try_join_next() {
            log_join(finished);
        }
        tasks.len()
    }

    /// Wait for every outstanding fill, including ones scheduled meanwhile.
    pub async fn drain(&self) -> Vec<FillReport> {
        let mut reports = Vec::new();
        loop {
            let mut pending = std::mem::take(&mut *self.tasks());
            if pending.is_empty() {
                break;
            }
            while let Some(finished) = pending.join_next().await {
                if let Some(report) = log_join(finished) {
                    reports.push(report);
                }
            }
        }
        reports
    }
}

fn log_join(result: Result<FillReport, JoinError>) -> Option<FillReport> {
    match result {
        Ok(report) => Some(report),
        Err(e) if e.is_cancelled() => {
            tracing::debug!("Prefetch fill cancelled");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Prefetch fill task panicked");
            None
        }
    }
}

impl std::fmt::Debug for Replenisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replenisher")
            .field("concurrency", &self.concurrency)
            .field("in_flight", &self.tasks().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reel_core::{Artifact, ReelResult};

    struct InstantProducer;

    #[async_trait]
    impl ArtifactProducer for InstantProducer {
        async fn produce(&self, idea: Option<Idea>) -> ReelResult<Artifact> {
            Ok(Artifact::new(idea.unwrap_or_else(|| Idea::from("instant")), "x"))
        }
    }

    fn replenisher(capacity: usize) -> (Arc<PrefetchQueue>, Arc<FeedMetrics>, Replenisher) {
        let queue = Arc::new(PrefetchQueue::new(capacity));
        let metrics = Arc::new(FeedMetrics::new());
        let replenisher =
            Replenisher::new(queue.clone(), Arc::new(InstantProducer), 2, metrics.clone());
        (queue, metrics, replenisher)
    }

    #[tokio::test]
    async fn test_schedule_and_drain_fills_queue() {
        let (queue, metrics, replenisher) = replenisher(3);

        replenisher.schedule(3, Some(Idea::from("Neon Racer")));
        let reports = replenisher.drain().await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].enqueued, 3);
        assert_eq!(queue.len(), 3);
        assert_eq!(metrics.snapshot().fills, 1);
        assert_eq!(replenisher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_fills_never_overflow() {
        let (queue, metrics, replenisher) = replenisher(4);

        for _ in 0..5 {
            replenisher.schedule(4, None);
        }
        replenisher.drain().await;

        assert_eq!(queue.len(), 4);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.fills, 5);
        assert_eq!(snapshot.fill_enqueued, 4);
    }

    #[tokio::test]
    async fn test_drain_with_nothing_scheduled() {
        let (_, _, replenisher) = replenisher(2);
        assert!(replenisher.drain().await.is_empty());
    }
}
