//! Pipeline error taxonomy
//!
//! Configuration problems are fatal - the pipeline refuses to start.
//! Generation failures stay stage-scoped (see the runner); a missing
//! artifact in front of the evaluator is fail-stop. Loop exhaustion is
//! deliberately absent here: it is an exit reason, not an error.

use rqa_knowledge::KnowledgeError;
use rqa_model::{Domain, StoreError};

/// Errors escaping the pipeline orchestrator
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid or incomplete configuration; the pipeline never starts
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A requested domain has no materialized artifact before evaluation
    #[error("missing artifact for domain '{0}' before evaluation")]
    MissingArtifact(Domain),

    /// The run was cancelled before producing a report
    #[error("pipeline cancelled")]
    Cancelled,

    /// Artifact store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<KnowledgeError> for PipelineError {
    fn from(error: KnowledgeError) -> Self {
        PipelineError::Configuration(error.to_string())
    }
}
