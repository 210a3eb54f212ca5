//! Deployed Component Routes
//!
//! Direct read/write access to the component the feed deploys into, plus
//! generating a game for a caller-chosen idea.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use reel_core::Idea;
use reel_feed::NextOutcome;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameZoneResponse {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGameZoneRequest {
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployGameRequest {
    #[serde(default)]
    pub game_name: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /gamezone - Currently deployed component
pub async fn get_gamezone(State(state): State<AppState>) -> ApiResult<Json<GameZoneResponse>> {
    let content = state
        .coordinator
        .current_content()
        .await?
        .ok_or_else(ApiError::not_deployed)?;

    Ok(Json(GameZoneResponse {
        path: state.target_path.clone(),
        content,
    }))
}

/// PUT /gamezone - Overwrite the deployed component
///
/// The content is written as given; it does not pass through the queue or
/// the merge step.
pub async fn put_gamezone(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<GameZoneResponse>> {
    let req: UpdateGameZoneRequest = serde_json::from_slice(&body)?;
    if req.content.trim().is_empty() {
        return Err(ApiError::invalid_input("content must not be empty"));
    }

    state.coordinator.write_content(&req.content).await?;

    Ok(Json(GameZoneResponse {
        path: state.target_path.clone(),
        content: req.content,
    }))
}

/// POST /gamezone/update - Generate and deploy a game for `game_name`
///
/// Runs the full pipeline with the given idea, skipping the queue. `200`
/// when deployed, `202` when a scroll was in flight and this was ignored.
pub async fn deploy_game(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<NextOutcome>)> {
    let req: DeployGameRequest = serde_json::from_slice(&body)?;
    let name = match req.game_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ApiError::invalid_input("game_name is required")),
    };

    let outcome = state.coordinator.deploy_idea(Idea::new(name)).await?;
    let status = if outcome.is_served() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(outcome)))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_gamezone).put(put_gamezone))
        .route("/update", post(deploy_game))
}
