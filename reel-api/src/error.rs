//! Error Types for the Reel API
//!
//! Every handler failure is rendered as JSON `{ code, message }` with a status
//! code derived from the [`ErrorCode`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reel_core::{ApplyError, ReelError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client Errors (400, 404)
    // ========================================================================
    /// Request body could not be parsed or failed validation
    InvalidInput,

    /// Server configuration rejected a value
    ValidationFailed,

    /// Nothing has been deployed yet
    NotDeployed,

    // ========================================================================
    // Upstream Errors (502)
    // ========================================================================
    /// Code generation failed
    GenerationFailed,

    /// Merge service failed or returned unusable output
    ApplyFailed,

    /// Text-generation provider failed
    UpstreamFailed,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Hosting sink could not be read or written
    DeployUnavailable,

    /// Logic fault inside the server
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,

            ErrorCode::NotDeployed => StatusCode::NOT_FOUND,

            ErrorCode::GenerationFailed | ErrorCode::ApplyFailed | ErrorCode::UpstreamFailed => {
                StatusCode::BAD_GATEWAY
            }

            ErrorCode::DeployUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::ValidationFailed => "Configuration validation failed",
            ErrorCode::NotDeployed => "No game has been deployed yet",
            ErrorCode::GenerationFailed => "Game generation failed",
            ErrorCode::ApplyFailed => "Merging the game failed",
            ErrorCode::UpstreamFailed => "Upstream provider failed",
            ErrorCode::DeployUnavailable => "Hosting service unavailable",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn not_deployed() -> Self {
        Self::from_code(ErrorCode::NotDeployed)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

/// Map feed errors onto HTTP categories.
///
/// Upstream failures are 502, hosting failures 503, configuration problems
/// 400. A full queue or an interrupted scroll reaching the HTTP layer is a
/// logic fault (500).
impl From<ReelError> for ApiError {
    fn from(err: ReelError) -> Self {
        let code = match &err {
            ReelError::GenerationFailed { .. } => ErrorCode::GenerationFailed,
            ReelError::ApplyFailed(_) => ErrorCode::ApplyFailed,
            ReelError::Llm(_) | ReelError::IdeaSourceUnavailable { .. } => {
                ErrorCode::UpstreamFailed
            }
            ReelError::DeploySink(_) => ErrorCode::DeployUnavailable,
            ReelError::Config(_) => ErrorCode::ValidationFailed,
            ReelError::Interrupted { .. } => ErrorCode::InternalError,
            ReelError::CapacityExceeded { .. } => {
                tracing::error!(error = %err, "Capacity fault reached the HTTP layer");
                ErrorCode::InternalError
            }
        };

        let mut details = serde_json::json!({ "kind": err.kind() });
        if let ReelError::ApplyFailed(ApplyError::Timeout { elapsed }) = &err {
            details["timeout_ms"] = serde_json::json!(elapsed.as_millis() as u64);
        }

        ApiError::new(code, err.to_string()).with_details(details)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::{ConfigError, LlmError, SinkError};
    use std::time::Duration;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotDeployed.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::GenerationFailed.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorCode::ApplyFailed.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorCode::DeployUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_reel_error_mapping() {
        let err = ApiError::from(ReelError::GenerationFailed {
            idea: "Neon Racer".to_string(),
            reason: "HTTP 500".to_string(),
        });
        assert_eq!(err.code, ErrorCode::GenerationFailed);
        assert!(err.message.contains("Neon Racer"));

        let err = ApiError::from(ReelError::from(SinkError::WriteFailed {
            path: "src/GameZone.js".to_string(),
            reason: "offline".to_string(),
        }));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::from(ReelError::from(LlmError::ProviderNotConfigured));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = ApiError::from(ReelError::from(ConfigError::MissingRequired {
            field: "OPENAI_API_KEY".to_string(),
        }));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(ReelError::CapacityExceeded { capacity: 5 });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::from(ReelError::Interrupted {
            reason: "task 7 was cancelled".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.details.unwrap()["kind"], "interrupted");
    }

    #[test]
    fn test_apply_timeout_details() {
        let err = ApiError::from(ReelError::from(ApplyError::Timeout {
            elapsed: Duration::from_secs(2),
        }));
        assert_eq!(err.code, ErrorCode::ApplyFailed);

        let details = err.details.unwrap();
        assert_eq!(details["kind"], "apply_failed");
        assert_eq!(details["timeout_ms"], 2000);
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::invalid_input("content must not be empty");
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("INVALID_INPUT"));
        assert!(!json.contains("details"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::not_deployed();
        let display = format!("{}", err);
        assert!(display.contains("NotDeployed"));
        assert!(display.contains("deployed"));
    }
}
