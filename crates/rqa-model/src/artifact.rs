//! Per-domain analysis artifacts
//!
//! One [`AnalysisArtifact`] is produced per completed domain stage. Artifacts
//! are immutable once constructed - re-runs supersede them under a new store
//! version, they are never mutated in place. A failed stage materializes as
//! [`StageArtifact::Failed`] so downstream consumers must surface the domain
//! as "not analyzed" instead of silently omitting it.

use crate::digest::ContentDigest;
use crate::domain::Domain;
use crate::finding::NormalizedFinding;
use crate::id::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance metadata for an analysis artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Run that produced the artifact
    pub run_id: RunId,
    /// Name of the producing stage
    pub stage: String,
    /// Label of the generative model that produced the analysis, if known
    pub model: Option<String>,
    /// Completion timestamp
    pub generated_at: DateTime<Utc>,
    /// Wall-clock duration of the stage in milliseconds
    pub duration_ms: u64,
}

impl ArtifactMetadata {
    /// Create metadata stamped with the current time
    #[must_use]
    pub fn new(run_id: RunId, stage: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            run_id,
            stage: stage.into(),
            model: None,
            generated_at: Utc::now(),
            duration_ms,
        }
    }

    /// With the generative model label
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Immutable result of one completed domain analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisArtifact {
    domain: Domain,
    findings: Vec<NormalizedFinding>,
    summary: String,
    metadata: ArtifactMetadata,
    digest: ContentDigest,
}

impl AnalysisArtifact {
    /// Assemble an artifact, computing its content digest
    #[must_use]
    pub fn new(
        domain: Domain,
        findings: Vec<NormalizedFinding>,
        summary: impl Into<String>,
        metadata: ArtifactMetadata,
    ) -> Self {
        let summary = summary.into();
        let digest = Self::digest_of(&domain, &findings, &summary);
        Self {
            domain,
            findings,
            summary,
            metadata,
            digest,
        }
    }

    /// Domain this artifact covers
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Findings, confidence guaranteed present
    #[inline]
    #[must_use]
    pub fn findings(&self) -> &[NormalizedFinding] {
        &self.findings
    }

    /// Stage-produced summary text
    #[inline]
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Provenance metadata
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    /// Content digest over domain, findings and summary
    #[inline]
    #[must_use]
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// Verify the digest still matches the content (after deserialization)
    #[inline]
    #[must_use]
    pub fn verify(&self) -> bool {
        self.digest == Self::digest_of(&self.domain, &self.findings, &self.summary)
    }

    fn digest_of(
        domain: &Domain,
        findings: &[NormalizedFinding],
        summary: &str,
    ) -> ContentDigest {
        let payload =
            serde_json::to_vec(&(domain, findings, summary)).unwrap_or_default();
        ContentDigest::compute(&payload)
    }
}

/// A stage-scoped failure record
///
/// Kept alongside completed artifacts so sibling stages are unaffected and
/// the failed domain stays visible end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// Domain that was not analyzed
    pub domain: Domain,
    /// Name of the failing stage
    pub stage: String,
    /// Failure description
    pub reason: String,
    /// Whether a re-run could plausibly succeed
    pub retryable: bool,
}

/// Outcome of one domain stage: a completed artifact or a failure record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageArtifact {
    /// The stage produced an analysis artifact
    Completed(AnalysisArtifact),
    /// The stage failed; the domain was not analyzed
    Failed(StageFailure),
}

impl StageArtifact {
    /// Domain covered by this outcome
    #[must_use]
    pub fn domain(&self) -> &Domain {
        match self {
            StageArtifact::Completed(artifact) => artifact.domain(),
            StageArtifact::Failed(failure) => &failure.domain,
        }
    }

    /// Whether the stage completed
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, StageArtifact::Completed(_))
    }

    /// The artifact, when completed
    #[must_use]
    pub fn as_completed(&self) -> Option<&AnalysisArtifact> {
        match self {
            StageArtifact::Completed(artifact) => Some(artifact),
            StageArtifact::Failed(_) => None,
        }
    }

    /// The failure record, when failed
    #[must_use]
    pub fn as_failed(&self) -> Option<&StageFailure> {
        match self {
            StageArtifact::Completed(_) => None,
            StageArtifact::Failed(failure) => Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Finding;
    use pretty_assertions::assert_eq;

    fn artifact_with(summary: &str) -> AnalysisArtifact {
        let finding = Finding::new(
            Domain::CodeQuality,
            "long_function",
            "Oversized function",
            "92 lines in one function",
            "Split into focused helpers",
        )
        .normalize();
        AnalysisArtifact::new(
            Domain::CodeQuality,
            vec![finding],
            summary,
            ArtifactMetadata::new(RunId::new(), "code_quality", 1200),
        )
    }

    #[test]
    fn digest_covers_content() {
        let a = artifact_with("one long function");
        let b = artifact_with("two long functions");
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn verify_detects_intact_artifact() {
        let artifact = artifact_with("summary");
        assert!(artifact.verify());
    }

    #[test]
    fn verify_survives_serde_round_trip() {
        let artifact = artifact_with("summary");
        let json = serde_json::to_string(&artifact).unwrap();
        let back: AnalysisArtifact = serde_json::from_str(&json).unwrap();
        assert!(back.verify());
        assert_eq!(back.digest(), artifact.digest());
    }

    #[test]
    fn stage_artifact_accessors() {
        let completed = StageArtifact::Completed(artifact_with("ok"));
        assert!(completed.is_completed());
        assert!(completed.as_completed().is_some());
        assert!(completed.as_failed().is_none());

        let failed = StageArtifact::Failed(StageFailure {
            domain: Domain::Security,
            stage: "security".to_string(),
            reason: "generation timed out".to_string(),
            retryable: true,
        });
        assert!(!failed.is_completed());
        assert_eq!(failed.domain(), &Domain::Security);
        assert_eq!(failed.as_failed().unwrap().reason, "generation timed out");
    }
}
