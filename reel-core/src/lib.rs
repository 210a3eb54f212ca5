//! Reel Core - Feed Types
//!
//! Pure data structures shared by every Reel crate. Traits and orchestration
//! live in reel-llm, reel-deploy and reel-feed.

pub mod config;
pub mod error;
pub mod text;

pub use config::*;
pub use error::*;
pub use text::strip_code_fences;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Artifact identifier using UUIDv7 for timestamp-sortable IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    /// Generate a new time-sortable id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// IDEA
// ============================================================================

/// A short natural-language game concept, e.g. "Neon Racer".
/// Duplicates are fine; ideas carry no identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Idea(String);

impl Idea {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Idea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Idea {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Idea {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// ARTIFACT
// ============================================================================

/// A finished, deployable game component plus the idea it came from.
///
/// The payload is already merged and sanitized, so consuming an artifact is a
/// single sink write. Fields are private: an artifact never changes after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    id: ArtifactId,
    idea: Idea,
    payload: String,
    created_at: Timestamp,
}

impl Artifact {
    /// Create an artifact stamped with the current time.
    pub fn new(idea: Idea, payload: impl Into<String>) -> Self {
        Self {
            id: ArtifactId::new(),
            idea,
            payload: payload.into(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn idea(&self) -> &Idea {
        &self.idea
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Split into idea and payload, consuming the artifact.
    pub fn into_parts(self) -> (Idea, String) {
        (self.idea, self.payload)
    }
}

// ============================================================================
// PIPELINE RUN
// ============================================================================

/// Stage of a single generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    IdeaPending,
    CodegenPending,
    ApplyPending,
    DeployPending,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdeaPending => "idea-pending",
            Self::CodegenPending => "codegen-pending",
            Self::ApplyPending => "apply-pending",
            Self::DeployPending => "deploy-pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ephemeral record of one generation. Lives only as long as the run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub idea: Option<Idea>,
    pub stage: PipelineStage,
    /// Stage the run was in when it failed
    pub failed_at: Option<PipelineStage>,
    pub error: Option<ReelError>,
    pub started_at: Timestamp,
}

impl PipelineRun {
    /// Start a run. Runs seeded with an idea skip the idea stage.
    pub fn start(idea: Option<Idea>) -> Self {
        let stage = if idea.is_some() {
            PipelineStage::CodegenPending
        } else {
            PipelineStage::IdeaPending
        };

        Self {
            run_id: Uuid::now_v7(),
            idea,
            stage,
            failed_at: None,
            error: None,
            started_at: Utc::now(),
        }
    }

    /// Move to the next stage. Terminal runs stay where they are.
    pub fn advance(&mut self, stage: PipelineStage) {
        if !self.stage.is_terminal() {
            self.stage = stage;
        }
    }

    /// Mark the run failed, remembering where it stopped.
    pub fn fail(&mut self, error: ReelError) {
        if !self.stage.is_terminal() {
            self.failed_at = Some(self.stage);
            self.stage = PipelineStage::Failed;
            self.error = Some(error);
        }
    }

    pub fn is_done(&self) -> bool {
        self.stage == PipelineStage::Done
    }
}

// ============================================================================
// COORDINATOR STATE
// ============================================================================

/// Scroll coordinator gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// Ready to accept a `next()` call
    Idle = 0,
    /// Popping from the prefetch queue and deploying
    Serving = 1,
    /// Queue was empty, generating synchronously
    FallbackGenerating = 2,
}

impl From<u8> for CoordinatorState {
    fn from(v: u8) -> Self {
        match v {
            0 => CoordinatorState::Idle,
            1 => CoordinatorState::Serving,
            _ => CoordinatorState::FallbackGenerating,
        }
    }
}

impl CoordinatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Serving => "serving",
            Self::FallbackGenerating => "fallback_generating",
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a served artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Popped from the prefetch queue
    Prefetched,
    /// Produced synchronously because the queue was empty
    Generated,
    /// Produced synchronously for a caller-named idea
    Requested,
}

/// Point-in-time view of the prefetch queue. Callers poll; this never updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub has_next: bool,
    pub count: usize,
    pub sample_idea: Option<Idea>,
}

impl Readiness {
    pub fn empty() -> Self {
        Self {
            has_next: false,
            count: 0,
            sample_idea: None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
