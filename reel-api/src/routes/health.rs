//! Health Check Endpoints

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// Create health check router
pub fn create_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/ping", get(ping))
}
