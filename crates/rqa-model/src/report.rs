//! Report drafts, refinement loop state and quality provenance
//!
//! Each refinement iteration produces a complete new draft version - never a
//! diff - so every iteration is independently auditable. Only the exit
//! reason and the final draft survive the loop.

use crate::domain::Domain;
use serde::{Deserialize, Serialize};

/// One full version of the review report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDraft {
    /// 1-based draft version
    pub version: u32,
    /// Complete report text
    pub content: String,
}

impl ReportDraft {
    /// Initial draft (version 1)
    #[inline]
    #[must_use]
    pub fn initial(content: impl Into<String>) -> Self {
        Self {
            version: 1,
            content: content.into(),
        }
    }

    /// Successor draft carrying the full replacement content
    #[inline]
    #[must_use]
    pub fn next(&self, content: impl Into<String>) -> Self {
        Self {
            version: self.version + 1,
            content: content.into(),
        }
    }
}

/// Why the refinement loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The critic approved the draft
    Approved,
    /// The iteration budget ran out before approval - not an error; the last
    /// draft is still delivered, marked unverified
    MaxIterations,
    /// The loop aborted (cancellation or unrecoverable failure)
    Error,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExitReason::Approved => "approved",
            ExitReason::MaxIterations => "max_iterations",
            ExitReason::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Mutable state of one refinement loop execution
///
/// Created at loop entry, discarded at loop exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopState {
    /// Completed iterations
    pub iteration: u32,
    /// Hard iteration cap
    pub max_iterations: u32,
    /// Most recent critique summary, if any
    pub last_critique: Option<String>,
    /// Set once the loop has exited
    pub exit_reason: Option<ExitReason>,
}

impl LoopState {
    /// Fresh state with the given iteration budget
    #[inline]
    #[must_use]
    pub fn new(max_iterations: u32) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            last_critique: None,
            exit_reason: None,
        }
    }

    /// Begin the next iteration; `false` when the budget is exhausted
    #[must_use]
    pub fn begin_iteration(&mut self) -> bool {
        if self.iteration >= self.max_iterations {
            return false;
        }
        self.iteration += 1;
        true
    }

    /// Record the latest critique summary
    #[inline]
    pub fn record_critique(&mut self, critique: impl Into<String>) {
        self.last_critique = Some(critique.into());
    }

    /// Mark the loop finished
    #[inline]
    pub fn finish(&mut self, reason: ExitReason) {
        self.exit_reason = Some(reason);
    }
}

/// Quality state of the final report
///
/// Always delivered with the report so consumers can distinguish an approved
/// result from an exhausted loop or partial domain coverage, instead of
/// taking a best-effort result as fully validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProvenance {
    /// How the refinement loop exited
    pub exit_reason: ExitReason,
    /// Iterations the loop consumed
    pub iterations: u32,
    /// Domains with a completed analysis
    pub domains_analyzed: Vec<Domain>,
    /// Domains whose stage failed
    pub domains_not_analyzed: Vec<Domain>,
}

impl QualityProvenance {
    /// Approved by the critic with every requested domain analyzed
    #[inline]
    #[must_use]
    pub fn is_fully_validated(&self) -> bool {
        self.exit_reason == ExitReason::Approved && self.domains_not_analyzed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_versions_increment() {
        let first = ReportDraft::initial("v1");
        let second = first.next("v2");
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(second.content, "v2");
    }

    #[test]
    fn loop_state_respects_budget() {
        let mut state = LoopState::new(2);
        assert!(state.begin_iteration());
        assert!(state.begin_iteration());
        assert!(!state.begin_iteration());
        assert_eq!(state.iteration, 2);
    }

    #[test]
    fn loop_state_zero_budget_never_iterates() {
        let mut state = LoopState::new(0);
        assert!(!state.begin_iteration());
    }

    #[test]
    fn provenance_requires_approval_and_full_coverage() {
        let approved_full = QualityProvenance {
            exit_reason: ExitReason::Approved,
            iterations: 2,
            domains_analyzed: vec![Domain::Security],
            domains_not_analyzed: vec![],
        };
        assert!(approved_full.is_fully_validated());

        let approved_partial = QualityProvenance {
            domains_not_analyzed: vec![Domain::Sustainability],
            ..approved_full.clone()
        };
        assert!(!approved_partial.is_fully_validated());

        let exhausted = QualityProvenance {
            exit_reason: ExitReason::MaxIterations,
            ..approved_full
        };
        assert!(!exhausted.is_fully_validated());
    }

    #[test]
    fn exit_reason_labels() {
        assert_eq!(ExitReason::Approved.to_string(), "approved");
        assert_eq!(ExitReason::MaxIterations.to_string(), "max_iterations");
        assert_eq!(ExitReason::Error.to_string(), "error");
    }
}
