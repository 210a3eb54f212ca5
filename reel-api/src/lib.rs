//! Reel API - HTTP Surface
//!
//! A thin axum layer over the scroll coordinator: scroll, prefetch, inspect
//! the queue, and read or overwrite the deployed component.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use bootstrap::build_collaborators;
pub use config::{LlmProvider, LogFormat, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_router;
pub use state::AppState;
