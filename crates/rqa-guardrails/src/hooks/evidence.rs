//! Required-field and evidence enforcement

use crate::context::StageContext;
use crate::error::HookError;
use crate::hook::{Hook, HookOutcome, HookPayload, HookPoint};
use async_trait::async_trait;

/// Validates decoded findings against the reporting contract
///
/// - A finding without a kind or description cannot be scored or reported;
///   it is dropped with a logged reason.
/// - A missing recommendation is corrected in place with a review note.
/// - Findings without any evidence are kept - the evaluator punishes them -
///   but counted so data-quality regressions surface in metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceRequirements;

impl EvidenceRequirements {
    /// Create the hook
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Hook for EvidenceRequirements {
    fn name(&self) -> &str {
        "evidence_requirements"
    }

    fn point(&self) -> HookPoint {
        HookPoint::AfterTool
    }

    async fn apply(
        &self,
        ctx: &mut StageContext,
        payload: HookPayload,
    ) -> Result<HookOutcome, HookError> {
        let HookPayload::Findings(findings) = payload else {
            return Ok(HookOutcome::Unchanged(payload));
        };

        let before = findings.len();
        let mut corrected = 0u64;
        let mut without_evidence = 0u64;

        let retained: Vec<_> = findings
            .into_iter()
            .filter_map(|mut finding| {
                if finding.kind.trim().is_empty() || finding.description.trim().is_empty() {
                    tracing::warn!(
                        finding = %finding.id,
                        domain = %ctx.domain,
                        "dropping finding with missing required fields"
                    );
                    return None;
                }
                if finding.recommendation.trim().is_empty() {
                    finding.recommendation = "Review and address manually.".to_string();
                    corrected += 1;
                }
                if !finding.has_location() && !finding.has_metric() && !finding.has_snippet() {
                    without_evidence += 1;
                }
                Some(finding)
            })
            .collect();

        let dropped = (before - retained.len()) as u64;
        ctx.bump("missing_required_fields", dropped);
        ctx.bump("corrected_recommendation", corrected);
        ctx.bump("missing_evidence", without_evidence);

        if dropped > 0 || corrected > 0 {
            Ok(HookOutcome::Replaced(HookPayload::Findings(retained)))
        } else {
            Ok(HookOutcome::Unchanged(HookPayload::Findings(retained)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqa_model::{Domain, Evidence, Finding, RunId, SourceLocation};

    fn ctx() -> StageContext {
        StageContext::new(RunId::new(), Domain::CodeQuality, "code")
    }

    fn complete_finding() -> Finding {
        Finding::new(
            Domain::CodeQuality,
            "long_function",
            "Oversized function",
            "Function is 92 lines",
            "Split it up",
        )
        .with_location(SourceLocation::file_line("src/big.rs", 10))
        .with_evidence(Evidence::Metric {
            name: "lines".to_string(),
            value: 92.0,
        })
    }

    #[tokio::test]
    async fn complete_findings_pass_unchanged() {
        let hook = EvidenceRequirements::new();
        let mut ctx = ctx();
        let outcome = hook
            .apply(&mut ctx, HookPayload::Findings(vec![complete_finding()]))
            .await
            .unwrap();
        assert!(matches!(outcome, HookOutcome::Unchanged(_)));
        assert_eq!(ctx.counter("missing_required_fields"), 0);
    }

    #[tokio::test]
    async fn empty_description_is_dropped() {
        let hook = EvidenceRequirements::new();
        let mut ctx = ctx();
        let bad = Finding::new(Domain::CodeQuality, "long_function", "Title", "", "Fix");
        let outcome = hook
            .apply(
                &mut ctx,
                HookPayload::Findings(vec![bad, complete_finding()]),
            )
            .await
            .unwrap();
        match outcome.into_payload() {
            HookPayload::Findings(findings) => assert_eq!(findings.len(), 1),
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(ctx.counter("missing_required_fields"), 1);
    }

    #[tokio::test]
    async fn missing_recommendation_is_corrected() {
        let hook = EvidenceRequirements::new();
        let mut ctx = ctx();
        let finding = Finding::new(
            Domain::CodeQuality,
            "dead_code",
            "Unused module",
            "Module is never referenced",
            "",
        );
        let outcome = hook
            .apply(&mut ctx, HookPayload::Findings(vec![finding]))
            .await
            .unwrap();
        match outcome.into_payload() {
            HookPayload::Findings(findings) => {
                assert_eq!(findings[0].recommendation, "Review and address manually.");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(ctx.counter("corrected_recommendation"), 1);
    }

    #[tokio::test]
    async fn evidence_less_findings_are_kept_but_counted() {
        let hook = EvidenceRequirements::new();
        let mut ctx = ctx();
        let finding = Finding::new(
            Domain::CodeQuality,
            "style",
            "Inconsistent naming",
            "Names mix conventions",
            "Pick one convention",
        );
        let outcome = hook
            .apply(&mut ctx, HookPayload::Findings(vec![finding]))
            .await
            .unwrap();
        match outcome.into_payload() {
            HookPayload::Findings(findings) => assert_eq!(findings.len(), 1),
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(ctx.counter("missing_evidence"), 1);
    }
}
