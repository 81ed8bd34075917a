//! Canonical data model for the review quality-assurance engine
//!
//! Defines the entities every other crate builds on:
//! - Findings with structured evidence and clamped confidence scores
//! - Immutable per-domain analysis artifacts (completed or failed)
//! - Evaluation records and run-level statistics
//! - Report drafts, refinement loop state and quality provenance
//! - The generative-call request/response boundary types
//! - A versioned, run-namespaced artifact store

pub mod artifact;
pub mod confidence;
pub mod digest;
pub mod domain;
pub mod evaluation;
pub mod evidence;
pub mod finding;
pub mod generation;
pub mod id;
pub mod report;
pub mod store;

pub use artifact::{AnalysisArtifact, ArtifactMetadata, StageArtifact, StageFailure};
pub use confidence::{ConfidenceBand, ConfidenceScore, ScoreError};
pub use digest::{ContentDigest, DigestError};
pub use domain::Domain;
pub use evaluation::{EvaluationRecord, EvaluationStats, Verdict};
pub use evidence::{Evidence, SourceLocation};
pub use finding::{Finding, NormalizedFinding};
pub use generation::{
    parse_structured_text, GenerationError, GenerationRequest, GenerationResponse,
};
pub use id::{FindingId, RunId};
pub use report::{ExitReason, LoopState, QualityProvenance, ReportDraft};
pub use store::{ArtifactKey, ArtifactStore, MemoryStore, StoreError};
