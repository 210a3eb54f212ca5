//! Shared application state for Axum routers.

use reel_feed::ScrollCoordinator;
use reel_llm::UsageTracker;
use std::sync::Arc;
use std::time::Instant;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ScrollCoordinator>,
    /// Token usage of the text-generation provider
    pub usage: Arc<UsageTracker>,
    /// Logical path of the deployed component
    pub target_path: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        coordinator: Arc<ScrollCoordinator>,
        usage: Arc<UsageTracker>,
        target_path: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            usage,
            target_path: target_path.into(),
            start_time: Instant::now(),
        }
    }
}
