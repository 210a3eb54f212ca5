//! Error types for Reel operations

use std::time::Duration;
use thiserror::Error;

/// Text-generation provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No LLM provider configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Apply (merge) service errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("Apply service error: {reason}")]
    Service { reason: String },

    #[error("Apply timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("Apply output violates component contract: {reason}")]
    ContractViolation { reason: String },
}

/// Hosting / deploy sink errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("Read failed for {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Write failed for {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Provider not supported: {provider}")]
    ProviderNotSupported { provider: String },
}

/// Master error type for all Reel errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReelError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Idea source unavailable: {reason}")]
    IdeaSourceUnavailable { reason: String },

    #[error("Generation failed for '{idea}': {reason}")]
    GenerationFailed { idea: String, reason: String },

    #[error("Apply failed: {0}")]
    ApplyFailed(#[from] ApplyError),

    #[error("Prefetch queue is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("Deploy sink error: {0}")]
    DeploySink(#[from] SinkError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scroll interrupted: {reason}")]
    Interrupted { reason: String },
}

impl ReelError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Llm(_) => "llm",
            Self::IdeaSourceUnavailable { .. } => "idea_source_unavailable",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::ApplyFailed(_) => "apply_failed",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::DeploySink(_) => "deploy_sink",
            Self::Config(_) => "config",
            Self::Interrupted { .. } => "interrupted",
        }
    }
}

/// Result type alias for Reel operations.
pub type ReelResult<T> = Result<T, ReelError>;

// =============================================================================
// TESTS
// =============================================================================
