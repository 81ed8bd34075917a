//! Explicit per-run context
//!
//! The single state object threaded through the pipeline call chain. It
//! holds exactly the current run's collaborators - there is no global
//! session or service registry to reach into.

use crate::config::ReviewConfig;
use rqa_knowledge::{FalsePositiveRegistry, KnowledgeBase, TemplateSet};
use rqa_model::{ArtifactStore, RunId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared collaborators and identity of one pipeline run
#[derive(Clone)]
pub struct RunContext {
    /// Run identity
    pub run_id: RunId,
    /// Validated configuration
    pub config: Arc<ReviewConfig>,
    /// Guideline documents (read-only, process-lifetime cache)
    pub knowledge: Arc<KnowledgeBase>,
    /// Prompt templates
    pub templates: Arc<TemplateSet>,
    /// False-positive pattern registry
    pub registry: Arc<FalsePositiveRegistry>,
    /// Artifact persistence
    pub store: Arc<dyn ArtifactStore>,
    /// Run-level cancellation; propagates to in-flight stages and the loop
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("domains", &self.config.domains)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Context for a fresh run
    #[must_use]
    pub fn new(
        config: Arc<ReviewConfig>,
        knowledge: Arc<KnowledgeBase>,
        templates: Arc<TemplateSet>,
        registry: Arc<FalsePositiveRegistry>,
        store: Arc<dyn ArtifactStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            run_id: RunId::new(),
            config,
            knowledge,
            templates,
            registry,
            store,
            cancel,
        }
    }

    /// Whether the run has been cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
