//! Configuration types

use crate::{ConfigError, ReelError, ReelResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default prefetch queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

/// Default number of pipeline runs a single fill executes concurrently.
pub const DEFAULT_FILL_CONCURRENCY: usize = 2;

/// Default logical path of the deployed component on the hosting service.
pub const DEFAULT_TARGET_PATH: &str = "src/GameZone.js";

/// Default name of the exported component.
pub const DEFAULT_COMPONENT_NAME: &str = "GameZone";

/// Default instruction handed to the apply service.
pub const DEFAULT_APPLY_INSTRUCTION: &str =
    "Replace the GameZone component with the updated game implementation. \
     Keep the default export of GameZone.";

/// Feed configuration shared by the queue, pipeline and coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Maximum number of prefetched artifacts (N)
    pub queue_capacity: usize,
    /// Worker pool size for a single fill call
    pub fill_concurrency: usize,
    /// Fixed logical path every deploy overwrites
    pub target_path: String,
    /// Component name the sanitation contract enforces
    pub component_name: String,
    /// Instruction sent with every apply request
    pub apply_instruction: String,
    /// Deadline for a single code generation call
    pub codegen_timeout: Option<Duration>,
    /// Deadline for a single apply call
    pub apply_timeout: Option<Duration>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            fill_concurrency: DEFAULT_FILL_CONCURRENCY,
            target_path: DEFAULT_TARGET_PATH.to_string(),
            component_name: DEFAULT_COMPONENT_NAME.to_string(),
            apply_instruction: DEFAULT_APPLY_INSTRUCTION.to_string(),
            codegen_timeout: None,
            apply_timeout: None,
        }
    }
}

impl FeedConfig {
    /// Create FeedConfig from environment variables.
    ///
    /// Environment variables:
    /// - `REEL_QUEUE_CAPACITY`: Prefetch queue capacity (default: 5)
    /// - `REEL_FILL_CONCURRENCY`: Concurrent runs per fill (default: 2)
    /// - `REEL_TARGET_PATH`: Deployed component path (default: src/GameZone.js)
    /// - `REEL_COMPONENT_NAME`: Exported component name (default: GameZone)
    /// - `REEL_APPLY_INSTRUCTION`: Instruction for the apply service
    /// - `REEL_CODEGEN_TIMEOUT_SECS`: Code generation deadline (default: none)
    /// - `REEL_APPLY_TIMEOUT_SECS`: Apply deadline (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            queue_capacity: std::env::var("REEL_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.queue_capacity),
            fill_concurrency: std::env::var("REEL_FILL_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fill_concurrency),
            target_path: std::env::var("REEL_TARGET_PATH").unwrap_or(defaults.target_path),
            component_name: std::env::var("REEL_COMPONENT_NAME")
                .unwrap_or(defaults.component_name),
            apply_instruction: std::env::var("REEL_APPLY_INSTRUCTION")
                .unwrap_or(defaults.apply_instruction),
            codegen_timeout: std::env::var("REEL_CODEGEN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            apply_timeout: std::env::var("REEL_APPLY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }

    /// Override the queue capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - queue_capacity > 0
    /// - fill_concurrency > 0
    /// - target_path and component_name are non-empty
    /// - timeouts, when set, are positive
    pub fn validate(&self) -> ReelResult<()> {
        if self.queue_capacity == 0 {
            return Err(invalid(
                "queue_capacity",
                self.queue_capacity.to_string(),
                "queue_capacity must be greater than 0",
            ));
        }

        if self.fill_concurrency == 0 {
            return Err(invalid(
                "fill_concurrency",
                self.fill_concurrency.to_string(),
                "fill_concurrency must be greater than 0",
            ));
        }

        if self.target_path.trim().is_empty() {
            return Err(ReelError::Config(ConfigError::MissingRequired {
                field: "target_path".to_string(),
            }));
        }

        if self.component_name.trim().is_empty() {
            return Err(ReelError::Config(ConfigError::MissingRequired {
                field: "component_name".to_string(),
            }));
        }

        for (field, timeout) in [
            ("codegen_timeout", self.codegen_timeout),
            ("apply_timeout", self.apply_timeout),
        ] {
            if matches!(timeout, Some(t) if t.is_zero()) {
                return Err(invalid(field, "0s".to_string(), "timeout must be positive"));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, value: String, reason: &str) -> ReelError {
    ReelError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    })
}
