//! Feed counters.

use crate::queue::FillReport;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for scroll and fill activity since startup.
#[derive(Debug, Default)]
pub struct FeedMetrics {
    /// `next()` calls served from the prefetch queue
    pub served_prefetched: AtomicU64,

    /// `next()` calls served by synchronous generation
    pub served_generated: AtomicU64,

    /// Named-idea deploys requested directly
    pub served_requested: AtomicU64,

    /// `next()` calls ignored because one was already in flight
    pub ignored: AtomicU64,

    /// Foreground failures surfaced to the caller
    pub failures: AtomicU64,

    /// Background fills completed
    pub fills: AtomicU64,

    /// Artifacts enqueued by fills
    pub fill_enqueued: AtomicU64,

    /// Pipeline runs that failed inside fills
    pub fill_failures: AtomicU64,

    /// Artifacts dropped because the queue was already full
    pub fill_rejected: AtomicU64,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished fill into the counters.
    pub fn record_fill(&self, report: &FillReport) {
        self.fills.fetch_add(1, Ordering::Relaxed);
        self.fill_enqueued
            .fetch_add(report.enqueued as u64, Ordering::Relaxed);
        self.fill_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.fill_rejected
            .fetch_add(report.rejected as u64, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> FeedMetricsSnapshot {
        FeedMetricsSnapshot {
            served_prefetched: self.served_prefetched.load(Ordering::Relaxed),
            served_generated: self.served_generated.load(Ordering::Relaxed),
            served_requested: self.served_requested.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            fills: self.fills.load(Ordering::Relaxed),
            fill_enqueued: self.fill_enqueued.load(Ordering::Relaxed),
            fill_failures: self.fill_failures.load(Ordering::Relaxed),
            fill_rejected: self.fill_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of feed metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedMetricsSnapshot {
    pub served_prefetched: u64,
    pub served_generated: u64,
    pub served_requested: u64,
    pub ignored: u64,
    pub failures: u64,
    pub fills: u64,
    pub fill_enqueued: u64,
    pub fill_failures: u64,
    pub fill_rejected: u64,
}

impl FeedMetricsSnapshot {
    /// Share of served scrolls that came from the queue, if any were served.
    ///
    /// Named-idea deploys are not scrolls and do not count.
    pub fn hit_rate(&self) -> Option<f64> {
        let served = self.served_prefetched + self.served_generated;
        (served > 0).then(|| self.served_prefetched as f64 / served as f64)
    }
}
