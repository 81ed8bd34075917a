//! Review pipeline configuration
//!
//! All tunables live here with the stated defaults; none are design
//! constants. Validation runs before the pipeline starts - a bad
//! configuration is fatal, never silently corrected.

use crate::error::PipelineError;
use crate::generative::RetryPolicy;
use rqa_model::Domain;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Weights of the evaluator's component scores; must sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationWeights {
    /// Weight of guideline alignment
    pub guideline_alignment: f64,
    /// Weight of evidence quality
    pub evidence_quality: f64,
    /// Weight of `1 − false_positive_likelihood`
    pub false_positive: f64,
    /// Weight of confidence alignment
    pub confidence_alignment: f64,
}

impl EvaluationWeights {
    /// Validate ranges and the sum-to-one constraint
    ///
    /// # Errors
    /// Returns [`PipelineError::Configuration`] on violation.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let weights = [
            self.guideline_alignment,
            self.evidence_quality,
            self.false_positive,
            self.confidence_alignment,
        ];
        if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(PipelineError::Configuration(
                "evaluation weights must each lie in [0, 1]".to_string(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(PipelineError::Configuration(format!(
                "evaluation weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

impl Default for EvaluationWeights {
    fn default() -> Self {
        Self {
            guideline_alignment: 0.40,
            evidence_quality: 0.30,
            false_positive: 0.20,
            confidence_alignment: 0.10,
        }
    }
}

/// Score thresholds mapping evaluation scores onto verdicts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictThresholds {
    /// Scores below this are filtered out of the report
    pub filter_below: f64,
    /// Scores at or above this are valid; the band between is flagged
    pub valid_at: f64,
}

impl VerdictThresholds {
    /// Validate ordering and range
    ///
    /// # Errors
    /// Returns [`PipelineError::Configuration`] on violation.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&self.filter_below)
            || !(0.0..=1.0).contains(&self.valid_at)
            || self.filter_below >= self.valid_at
        {
            return Err(PipelineError::Configuration(format!(
                "verdict thresholds must satisfy 0 <= filter_below < valid_at <= 1, \
                 got {} / {}",
                self.filter_below, self.valid_at
            )));
        }
        Ok(())
    }
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            filter_below: 0.40,
            valid_at: 0.60,
        }
    }
}

/// How changed files are presented to the analysis stages
///
/// Concatenating catches cross-file issues but spends context budget;
/// per-file passes scale to large changesets. Deliberately a configuration
/// knob, not a fixed policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextStrategy {
    /// One request per domain over all files joined into one context
    #[default]
    Concatenated,
    /// One request per (domain, file) pair; findings merge per domain
    PerFile,
}

/// Configuration for one review pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Domains to analyze
    pub domains: Vec<Domain>,
    /// Maximum concurrently running domain stages
    pub concurrency: usize,
    /// Refinement loop iteration cap
    pub max_iterations: u32,
    /// Upper bound on deficiencies accepted from one critique
    pub max_deficiencies: usize,
    /// Evaluator component weights
    pub weights: EvaluationWeights,
    /// Evaluator verdict thresholds
    pub thresholds: VerdictThresholds,
    /// Generative call retry policy
    pub retry: RetryPolicy,
    /// Code context strategy
    pub context_strategy: ContextStrategy,
    /// Directory holding `<domain>.yaml` guideline documents
    pub knowledge_root: PathBuf,
    /// Whether a missing guideline document is fatal
    pub strict_knowledge: bool,
}

impl ReviewConfig {
    /// Defaults: all built-in domains, concurrency 2, five loop iterations
    #[must_use]
    pub fn new(knowledge_root: impl Into<PathBuf>) -> Self {
        Self {
            domains: Domain::BUILTIN.to_vec(),
            concurrency: 2,
            max_iterations: 5,
            max_deficiencies: 5,
            weights: EvaluationWeights::default(),
            thresholds: VerdictThresholds::default(),
            retry: RetryPolicy::default(),
            context_strategy: ContextStrategy::default(),
            knowledge_root: knowledge_root.into(),
            strict_knowledge: true,
        }
    }

    /// With a specific domain list
    #[inline]
    #[must_use]
    pub fn with_domains(mut self, domains: Vec<Domain>) -> Self {
        self.domains = domains;
        self
    }

    /// With a stage concurrency limit
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// With a refinement iteration cap
    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// With a context strategy
    #[inline]
    #[must_use]
    pub fn with_context_strategy(mut self, strategy: ContextStrategy) -> Self {
        self.context_strategy = strategy;
        self
    }

    /// Validate the whole configuration
    ///
    /// # Errors
    /// Returns [`PipelineError::Configuration`] on the first violation.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.domains.is_empty() {
            return Err(PipelineError::Configuration(
                "at least one domain must be configured".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(PipelineError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(PipelineError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        self.weights.validate()?;
        self.thresholds.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ReviewConfig::new("kb").validate().is_ok());
    }

    #[test]
    fn default_weights_match_stated_model() {
        let w = EvaluationWeights::default();
        assert!((w.guideline_alignment - 0.40).abs() < f64::EPSILON);
        assert!((w.evidence_quality - 0.30).abs() < f64::EPSILON);
        assert!((w.false_positive - 0.20).abs() < f64::EPSILON);
        assert!((w.confidence_alignment - 0.10).abs() < f64::EPSILON);
    }

    #[test]
    fn weights_must_sum_to_one() {
        let weights = EvaluationWeights {
            guideline_alignment: 0.5,
            evidence_quality: 0.5,
            false_positive: 0.5,
            confidence_alignment: 0.5,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let thresholds = VerdictThresholds {
            filter_below: 0.7,
            valid_at: 0.6,
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn empty_domains_rejected() {
        let config = ReviewConfig::new("kb").with_domains(vec![]);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = ReviewConfig::new("kb").with_concurrency(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let config = ReviewConfig::new("kb").with_max_iterations(0);
        assert!(config.validate().is_err());
    }
}
