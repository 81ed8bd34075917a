//! The canonical finding and its normalized form
//!
//! A [`Finding`] is what an analysis stage reports. Normalization enforces
//! the confidence invariant: every persisted finding has a score, and a
//! producer that omitted one gets exactly the 0.50 default with exactly one
//! data-quality warning - the finding itself is never dropped for that.

use crate::confidence::ConfidenceScore;
use crate::domain::Domain;
use crate::evidence::{Evidence, SourceLocation};
use crate::id::FindingId;
use serde::{Deserialize, Serialize};

/// A single reported issue with evidence and confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Unique identifier
    pub id: FindingId,
    /// Domain that produced the finding
    pub domain: Domain,
    /// Issue kind, e.g. `sql_injection` or `long_function`
    pub kind: String,
    /// Short human-readable title
    pub title: String,
    /// Where in the code the issue lives
    pub location: Option<SourceLocation>,
    /// What is wrong
    pub description: String,
    /// How to fix it
    pub recommendation: String,
    /// Supporting evidence
    pub evidence: Vec<Evidence>,
    /// Producer-assigned confidence, if any
    pub confidence: Option<ConfidenceScore>,
    /// Producer's justification for the confidence
    pub confidence_reasoning: Option<String>,
}

impl Finding {
    /// Create a minimal finding; evidence and confidence via the builders
    #[must_use]
    pub fn new(
        domain: Domain,
        kind: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            id: FindingId::new(),
            domain,
            kind: kind.into(),
            title: title.into(),
            location: None,
            description: description.into(),
            recommendation: recommendation.into(),
            evidence: Vec::new(),
            confidence: None,
            confidence_reasoning: None,
        }
    }

    /// With a source location
    #[inline]
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// With an evidence item appended
    #[inline]
    #[must_use]
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// With a producer confidence and reasoning
    #[inline]
    #[must_use]
    pub fn with_confidence(
        mut self,
        confidence: ConfidenceScore,
        reasoning: impl Into<String>,
    ) -> Self {
        self.confidence = Some(confidence);
        self.confidence_reasoning = Some(reasoning.into());
        self
    }

    /// Whether the finding is anchored to a concrete location
    #[inline]
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.location.as_ref().is_some_and(SourceLocation::is_anchored)
    }

    /// Whether any evidence item is a measured metric
    #[inline]
    #[must_use]
    pub fn has_metric(&self) -> bool {
        self.evidence.iter().any(Evidence::is_metric)
    }

    /// Whether any evidence item is a code snippet
    #[inline]
    #[must_use]
    pub fn has_snippet(&self) -> bool {
        self.evidence.iter().any(Evidence::is_snippet)
    }

    /// Whether a tool independently confirmed the finding
    #[inline]
    #[must_use]
    pub fn has_tool_confirmation(&self) -> bool {
        self.evidence.iter().any(Evidence::is_tool_confirmation)
    }

    /// Enforce the confidence invariant
    ///
    /// A missing producer confidence becomes exactly
    /// [`ConfidenceScore::DEFAULT`] and one data-quality warning is logged.
    #[must_use]
    pub fn normalize(self) -> NormalizedFinding {
        match self.confidence {
            Some(confidence) => NormalizedFinding {
                finding: self,
                confidence,
                defaulted: false,
            },
            None => {
                tracing::warn!(
                    finding = %self.id,
                    domain = %self.domain,
                    kind = %self.kind,
                    "finding missing producer confidence, assigning default 0.50"
                );
                NormalizedFinding {
                    finding: self,
                    confidence: ConfidenceScore::DEFAULT,
                    defaulted: true,
                }
            }
        }
    }
}

/// A finding whose confidence is guaranteed present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFinding {
    finding: Finding,
    confidence: ConfidenceScore,
    defaulted: bool,
}

impl NormalizedFinding {
    /// The underlying finding
    #[inline]
    #[must_use]
    pub fn finding(&self) -> &Finding {
        &self.finding
    }

    /// Finding identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> FindingId {
        self.finding.id
    }

    /// The guaranteed confidence score
    #[inline]
    #[must_use]
    pub fn confidence(&self) -> ConfidenceScore {
        self.confidence
    }

    /// Whether the score was defaulted during normalization
    #[inline]
    #[must_use]
    pub fn was_defaulted(&self) -> bool {
        self.defaulted
    }

    /// Transform the underlying finding, preserving normalization state
    ///
    /// Used by guardrail hooks that rewrite wording or evidence; the
    /// confidence and its defaulted flag carry over unchanged so the
    /// one-warning-per-finding invariant holds.
    #[must_use]
    pub fn map(self, f: impl FnOnce(Finding) -> Finding) -> Self {
        Self {
            finding: f(self.finding),
            confidence: self.confidence,
            defaulted: self.defaulted,
        }
    }
}
