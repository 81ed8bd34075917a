//! The hook trait and its payload types

use crate::context::StageContext;
use crate::error::HookError;
use async_trait::async_trait;
use rqa_model::{AnalysisArtifact, Finding, GenerationRequest};

/// Interception point a hook attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Before a generative call; payload is the outgoing request
    BeforeGeneration,
    /// After a tool/sub-routine call; payload is structured output or the
    /// decoded findings
    AfterTool,
    /// After a stage completes; payload is the assembled artifact
    AfterStage,
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            HookPoint::BeforeGeneration => "before_generation",
            HookPoint::AfterTool => "after_tool",
            HookPoint::AfterStage => "after_stage",
        };
        write!(f, "{label}")
    }
}

/// Data flowing through a hook chain
///
/// A hook receives the payload kind of its point; it must pass through the
/// kinds it does not handle unchanged.
#[derive(Debug, Clone)]
pub enum HookPayload {
    /// Outgoing generation request
    Request(GenerationRequest),
    /// Raw structured output before decoding
    Structured(serde_json::Value),
    /// Decoded findings before artifact assembly
    Findings(Vec<Finding>),
    /// Assembled artifact
    Artifact(AnalysisArtifact),
}

/// Result of one hook application
#[derive(Debug, Clone)]
pub enum HookOutcome {
    /// Pass-through; the payload is unchanged
    Unchanged(HookPayload),
    /// The hook produced a replacement payload
    Replaced(HookPayload),
}

impl HookOutcome {
    /// The carried payload, whichever variant
    #[must_use]
    pub fn into_payload(self) -> HookPayload {
        match self {
            HookOutcome::Unchanged(payload) | HookOutcome::Replaced(payload) => payload,
        }
    }
}

/// A validation/transformation function attached to an interception point
///
/// Hooks are pure transformations: no side effects beyond logging and the
/// counters on [`StageContext`]. A hook performing network calls must bound
/// itself with its own timeout and degrade instead of blocking the stage.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Hook name for logs and metrics
    fn name(&self) -> &str;

    /// Interception point this hook attaches to
    fn point(&self) -> HookPoint;

    /// Apply the hook
    ///
    /// # Errors
    /// Any error is absorbed fail-open by the engine; the hook becomes a
    /// no-op for this invocation.
    async fn apply(
        &self,
        ctx: &mut StageContext,
        payload: HookPayload,
    ) -> Result<HookOutcome, HookError>;
}
