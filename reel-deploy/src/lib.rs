//! Reel Deploy - Apply, Sanitize, Deploy
//!
//! The back half of the feed pipeline: merging generated code into the
//! currently deployed file, forcing the merged output into the fixed
//! component shape, and writing it to the hosting service.

pub mod apply;
pub mod contract;
pub mod scaffold;
pub mod sink;

pub use apply::{ChatApplyEngine, ReplaceApplyEngine, DEFAULT_APPLY_BASE_URL, DEFAULT_APPLY_MODEL};
pub use contract::{ComponentContract, Sanitized};
pub use scaffold::scaffold;
pub use sink::{DirectorySink, MemorySink};

use async_trait::async_trait;
use reel_core::ReelResult;

// ============================================================================
// APPLY ENGINE TRAIT
// ============================================================================

/// Merges an update into the current file contents.
///
/// Output is untrusted and must be sanitized before deploy. Implementations
/// report transport and service failures as `ApplyError::Service` and never
/// retry.
#[async_trait]
pub trait ApplyEngine: Send + Sync {
    async fn apply(&self, current: &str, instruction: &str, update: &str) -> ReelResult<String>;

    fn name(&self) -> &str;
}

// ============================================================================
// DEPLOY SINK TRAIT
// ============================================================================

/// Hosting file system holding the deployed component.
#[async_trait]
pub trait DeploySink: Send + Sync {
    /// Read a file. `Ok(None)` means it does not exist yet.
    async fn read(&self, path: &str) -> ReelResult<Option<String>>;

    /// Overwrite a file with new contents.
    async fn write(&self, path: &str, content: &str) -> ReelResult<()>;
}
