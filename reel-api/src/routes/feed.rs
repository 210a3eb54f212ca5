//! Feed Routes
//!
//! Scrolling, prefetching and queue inspection.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use reel_core::{CoordinatorState, Idea, Readiness};
use reel_feed::{FeedMetricsSnapshot, NextOutcome};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub state: CoordinatorState,
    pub readiness: Readiness,
    pub queue_capacity: usize,
    pub fills_in_flight: usize,
    pub metrics: FeedMetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_rate: Option<f64>,
    pub usage: UsageSnapshot,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub requests: u64,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

/// Body of `POST /prefetch`. An empty body means "fill to capacity".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchRequest {
    pub target: Option<usize>,
    pub idea_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchResponse {
    /// Target after clamping to capacity
    pub target: usize,
    pub queue_len: usize,
    pub fills_in_flight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub dropped: usize,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /status - Readiness, coordinator state and counters
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let coordinator = &state.coordinator;
    let metrics = coordinator.metrics();

    Json(StatusResponse {
        state: coordinator.state(),
        readiness: coordinator.readiness(),
        queue_capacity: coordinator.queue().capacity(),
        fills_in_flight: coordinator.fills_in_flight(),
        hit_rate: metrics.hit_rate(),
        metrics,
        usage: UsageSnapshot {
            requests: state.usage.requests(),
            input_tokens: state.usage.input_tokens(),
            output_tokens: state.usage.output_tokens(),
        },
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// POST /next - Deploy the next game
///
/// `200` when a game was deployed, `202` when another scroll was still in
/// flight and this one was ignored.
pub async fn next(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<NextOutcome>)> {
    let outcome = state.coordinator.next().await?;
    let status = if outcome.is_served() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(outcome)))
}

/// POST /prefetch - Schedule a background fill
pub async fn prefetch(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<PrefetchResponse>)> {
    let req: PrefetchRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PrefetchRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };

    let idea_hint = match req.idea_hint {
        Some(hint) if hint.trim().is_empty() => {
            return Err(ApiError::invalid_input("idea_hint must not be blank"));
        }
        Some(hint) => Some(Idea::new(hint.trim())),
        None => None,
    };

    let target = state.coordinator.prefetch(req.target, idea_hint);
    tracing::debug!(target, "Prefetch requested");

    Ok((
        StatusCode::ACCEPTED,
        Json(PrefetchResponse {
            target,
            queue_len: state.coordinator.queue().len(),
            fills_in_flight: state.coordinator.fills_in_flight(),
        }),
    ))
}

/// POST /queue/reset - Discard every queued game
pub async fn reset_queue(State(state): State<AppState>) -> Json<ResetResponse> {
    Json(ResetResponse {
        dropped: state.coordinator.reset_queue(),
    })
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/next", post(next))
        .route("/prefetch", post(prefetch))
        .route("/queue/reset", post(reset_queue))
}
