//! Reel API Server Entry Point
//!
//! Loads configuration, wires the feed collaborators and serves HTTP until
//! interrupted. Background fills are drained before exit.

use std::sync::Arc;

use reel_api::telemetry::init_tracing;
use reel_api::{build_collaborators, create_router, ApiError, ApiResult, AppState, ServerConfig};
use reel_feed::ScrollCoordinator;
use reel_llm::UsageTracker;

#[tokio::main]
async fn main() -> ApiResult<()> {
    // A missing .env is fine; the environment may already be populated.
    let dotenv = dotenvy::dotenv();

    let config = ServerConfig::from_env()?;
    init_tracing(config.log_format)?;
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }
    config.validate()?;
    tracing::debug!(?config, "Configuration loaded");

    let usage = Arc::new(UsageTracker::new());
    let collaborators = build_collaborators(&config, usage.clone())?;
    let coordinator = Arc::new(ScrollCoordinator::from_collaborators(
        collaborators,
        config.feed.clone(),
    )?);

    if config.warm_start {
        let target = coordinator.prefetch(None, None);
        tracing::info!(target, "Warm start prefetch scheduled");
    }

    let state = AppState::new(coordinator.clone(), usage, config.feed.target_path.clone());
    let app = create_router(state);

    let addr = config.socket_addr()?;
    tracing::info!(%addr, provider = %config.provider, "Starting Reel API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let reports = coordinator.drain().await;
    tracing::info!(fills = reports.len(), "Background fills drained");
    Ok(())
}
