//! HTTP Routes

pub mod feed;
pub mod gamezone;
pub mod health;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: &'static [&'static str],
}

const ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /status",
    "POST /next",
    "POST /prefetch",
    "POST /queue/reset",
    "GET /gamezone",
    "PUT /gamezone",
    "POST /gamezone/update",
    "GET /health/ping",
];

/// GET / - Service description
pub async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: "Scrollable feed of generated mini-games",
        endpoints: ENDPOINTS,
    })
}

/// Build the full router with request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .merge(feed::create_router())
        .nest("/gamezone", gamezone::create_router())
        .nest("/health", health::create_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
