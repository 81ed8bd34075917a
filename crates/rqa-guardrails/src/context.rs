//! Per-stage hook context
//!
//! An explicit state object threaded through the hook chain - there is no
//! implicit global session registry. Hooks read the stage's inputs from it
//! and accumulate their counters on it; the engine merges the counters into
//! the global metrics after each run.

use rqa_model::{Domain, RunId};
use std::collections::{BTreeMap, BTreeSet};

/// State shared across the hooks of one stage execution
#[derive(Debug, Clone)]
pub struct StageContext {
    /// Run this stage belongs to
    pub run_id: RunId,
    /// Domain under analysis
    pub domain: Domain,
    /// Code context handed to the stage
    pub code_context: String,
    /// File paths present in the code context; used to detect hallucinated
    /// references
    pub known_files: BTreeSet<String>,
    /// Rendered guideline block for the domain
    pub guidelines: Option<String>,
    /// Schema the stage's structured output must satisfy
    pub output_schema: Option<serde_json::Value>,
    /// Scratch metadata for hook-to-runner signalling
    metadata: BTreeMap<String, serde_json::Value>,
    /// Filter counters by category, merged into global metrics by the engine
    counters: BTreeMap<String, u64>,
}

impl StageContext {
    /// Context for one stage execution
    #[must_use]
    pub fn new(run_id: RunId, domain: Domain, code_context: impl Into<String>) -> Self {
        Self {
            run_id,
            domain,
            code_context: code_context.into(),
            known_files: BTreeSet::new(),
            guidelines: None,
            output_schema: None,
            metadata: BTreeMap::new(),
            counters: BTreeMap::new(),
        }
    }

    /// With the file paths present in the code context
    #[must_use]
    pub fn with_known_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// With the rendered guideline block
    #[inline]
    #[must_use]
    pub fn with_guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.guidelines = Some(guidelines.into());
        self
    }

    /// With the structured-output schema
    #[inline]
    #[must_use]
    pub fn with_output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Record a metadata value
    pub fn set_meta(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Read a metadata value
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Increment a filter counter
    pub fn bump(&mut self, category: &str, count: u64) {
        if count > 0 {
            *self.counters.entry(category.to_string()).or_insert(0) += count;
        }
    }

    /// Counter value for a category
    #[must_use]
    pub fn counter(&self, category: &str) -> u64 {
        self.counters.get(category).copied().unwrap_or(0)
    }

    /// All counters, drained for merging into global metrics
    pub(crate) fn drain_counters(&mut self) -> BTreeMap<String, u64> {
        std::mem::take(&mut self.counters)
    }
}
