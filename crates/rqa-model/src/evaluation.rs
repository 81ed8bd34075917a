//! Evaluation records and run-level statistics
//!
//! An [`EvaluationRecord`] is a derived entity: always computed from a
//! finding plus the current guideline snapshot, never hand-edited, and
//! additive - producing records never mutates the analysis artifacts.

use crate::domain::Domain;
use crate::id::FindingId;
use serde::{Deserialize, Serialize};

/// Evaluator verdict for one finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Included in the report
    Valid,
    /// Included with a "requires review" marker
    Flagged,
    /// Excluded from the report
    Filtered,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Verdict::Valid => "valid",
            Verdict::Flagged => "flagged",
            Verdict::Filtered => "filtered",
        };
        write!(f, "{label}")
    }
}

/// Independent re-scoring of one finding
///
/// All component scores and the weighted total live in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Finding this record scores
    pub finding_id: FindingId,
    /// Domain of the finding
    pub domain: Domain,
    /// How well the finding aligns with the domain guidelines
    pub guideline_alignment: f64,
    /// Strength of the attached evidence
    pub evidence_quality: f64,
    /// Likelihood the finding is a false positive
    pub false_positive_likelihood: f64,
    /// How closely the producer's confidence matches the independent estimate
    pub confidence_alignment: f64,
    /// Weighted total score
    pub evaluation_score: f64,
    /// Resulting verdict
    pub verdict: Verdict,
    /// Why the record scored the way it did
    pub reasoning: String,
}

impl EvaluationRecord {
    /// Whether every score component is inside the unit interval
    #[must_use]
    pub fn scores_in_bounds(&self) -> bool {
        [
            self.guideline_alignment,
            self.evidence_quality,
            self.false_positive_likelihood,
            self.confidence_alignment,
            self.evaluation_score,
        ]
        .iter()
        .all(|score| (0.0..=1.0).contains(score))
    }
}

/// Run-level evaluation statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStats {
    /// Total findings evaluated
    pub total: usize,
    /// Verdict counts
    pub valid: usize,
    /// Findings flagged for review
    pub flagged: usize,
    /// Findings excluded from the report
    pub filtered: usize,
    /// Mean evaluation score across all records (0 when empty)
    pub mean_score: f64,
    /// Domains with a completed artifact
    pub domains_evaluated: Vec<Domain>,
    /// Domains whose stage failed - explicitly surfaced, never omitted
    pub domains_not_analyzed: Vec<Domain>,
}

impl EvaluationStats {
    /// Aggregate statistics from a record set
    #[must_use]
    pub fn from_records(
        records: &[EvaluationRecord],
        domains_evaluated: Vec<Domain>,
        domains_not_analyzed: Vec<Domain>,
    ) -> Self {
        let total = records.len();
        let valid = records.iter().filter(|r| r.verdict == Verdict::Valid).count();
        let flagged = records
            .iter()
            .filter(|r| r.verdict == Verdict::Flagged)
            .count();
        let filtered = records
            .iter()
            .filter(|r| r.verdict == Verdict::Filtered)
            .count();
        let mean_score = if total == 0 {
            0.0
        } else {
            records.iter().map(|r| r.evaluation_score).sum::<f64>() / total as f64
        };
        Self {
            total,
            valid,
            flagged,
            filtered,
            mean_score,
            domains_evaluated,
            domains_not_analyzed,
        }
    }

    /// Whether every requested domain produced an artifact
    #[inline]
    #[must_use]
    pub fn full_coverage(&self) -> bool {
        self.domains_not_analyzed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(score: f64, verdict: Verdict) -> EvaluationRecord {
        EvaluationRecord {
            finding_id: FindingId::new(),
            domain: Domain::Security,
            guideline_alignment: 0.8,
            evidence_quality: 0.8,
            false_positive_likelihood: 0.1,
            confidence_alignment: 0.9,
            evaluation_score: score,
            verdict,
            reasoning: "test".to_string(),
        }
    }

    #[test]
    fn stats_count_verdicts() {
        let records = vec![
            record(0.8, Verdict::Valid),
            record(0.5, Verdict::Flagged),
            record(0.2, Verdict::Filtered),
            record(0.7, Verdict::Valid),
        ];
        let stats =
            EvaluationStats::from_records(&records, vec![Domain::Security], vec![]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.flagged, 1);
        assert_eq!(stats.filtered, 1);
        assert!((stats.mean_score - 0.55).abs() < 1e-9);
        assert!(stats.full_coverage());
    }

    #[test]
    fn stats_empty_records() {
        let stats = EvaluationStats::from_records(&[], vec![], vec![Domain::Security]);
        assert_eq!(stats.total, 0);
        assert!((stats.mean_score - 0.0).abs() < f64::EPSILON);
        assert!(!stats.full_coverage());
    }

    #[test]
    fn scores_in_bounds_detects_violations() {
        let mut r = record(0.8, Verdict::Valid);
        assert!(r.scores_in_bounds());
        r.evidence_quality = 1.2;
        assert!(!r.scores_in_bounds());
    }
}
