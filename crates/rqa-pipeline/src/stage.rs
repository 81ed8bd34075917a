//! Stage descriptors and the static execution plan
//!
//! The pipeline is an explicit, statically-defined list of stage
//! descriptors; scheduling is index-based over that list. Descriptors are
//! plain data - a stage is instantiated per pipeline composition and never
//! shared between two compositions.

use crate::error::PipelineError;
use rqa_model::Domain;
use serde::{Deserialize, Serialize};

/// Description of one domain analysis stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Domain the stage analyzes
    pub domain: Domain,
    /// Stage name used in logs, metadata and store keys
    pub name: String,
    /// Prompt template id driving the stage
    pub template: String,
    /// Whether the stage participates in the run
    pub enabled: bool,
}

impl StageDescriptor {
    /// Default descriptor for a domain, driven by the standard template
    #[must_use]
    pub fn for_domain(domain: Domain) -> Self {
        let name = domain.name().to_string();
        Self {
            domain,
            name,
            template: "stage_analysis".to_string(),
            enabled: true,
        }
    }

    /// Disable this stage
    #[inline]
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Validated, ordered stage list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    stages: Vec<StageDescriptor>,
}

impl StagePlan {
    /// Validate a descriptor list into a plan
    ///
    /// # Errors
    /// Returns [`PipelineError::Configuration`] for duplicate domains or a
    /// plan with no enabled stage.
    pub fn new(stages: Vec<StageDescriptor>) -> Result<Self, PipelineError> {
        let mut seen = std::collections::BTreeSet::new();
        for stage in &stages {
            if !seen.insert(stage.domain.clone()) {
                return Err(PipelineError::Configuration(format!(
                    "duplicate stage for domain '{}'",
                    stage.domain
                )));
            }
        }
        if !stages.iter().any(|s| s.enabled) {
            return Err(PipelineError::Configuration(
                "stage plan has no enabled stage".to_string(),
            ));
        }
        Ok(Self { stages })
    }

    /// Default plan for a domain list
    ///
    /// # Errors
    /// Propagates [`StagePlan::new`] validation.
    pub fn for_domains(domains: &[Domain]) -> Result<Self, PipelineError> {
        Self::new(
            domains
                .iter()
                .cloned()
                .map(StageDescriptor::for_domain)
                .collect(),
        )
    }

    /// Enabled stages with their plan indices, in plan order
    pub fn enabled(&self) -> impl Iterator<Item = (usize, &StageDescriptor)> {
        self.stages
            .iter()
            .enumerate()
            .filter(|(_, stage)| stage.enabled)
    }

    /// Domains of the enabled stages, in plan order
    #[must_use]
    pub fn domains(&self) -> Vec<Domain> {
        self.enabled()
            .map(|(_, stage)| stage.domain.clone())
            .collect()
    }

    /// Total descriptor count, enabled or not
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the plan holds no descriptors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
