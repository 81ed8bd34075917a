//! Hallucinated-reference removal

use crate::context::StageContext;
use crate::error::HookError;
use crate::hook::{Hook, HookOutcome, HookPayload, HookPoint};
use async_trait::async_trait;
use rqa_model::AnalysisArtifact;

/// Removes findings whose file references do not occur in the source context
///
/// Generative output occasionally cites files that were never part of the
/// review. A finding with no file reference at all is kept - being
/// conservative here avoids throwing away real issues that merely lack an
/// anchor (the evaluator scores those down instead).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceFilter;

impl ReferenceFilter {
    /// Create the hook
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Hook for ReferenceFilter {
    fn name(&self) -> &str {
        "reference_filter"
    }

    fn point(&self) -> HookPoint {
        HookPoint::AfterStage
    }

    async fn apply(
        &self,
        ctx: &mut StageContext,
        payload: HookPayload,
    ) -> Result<HookOutcome, HookError> {
        let HookPayload::Artifact(artifact) = payload else {
            return Ok(HookOutcome::Unchanged(payload));
        };

        let before = artifact.findings().len();
        let retained: Vec<_> = artifact
            .findings()
            .iter()
            .filter(|nf| {
                let finding = nf.finding();
                let Some(file) = finding.location.as_ref().and_then(|l| l.file.as_ref())
                else {
                    return true;
                };
                let known =
                    ctx.known_files.contains(file) || ctx.code_context.contains(file.as_str());
                if !known {
                    tracing::warn!(
                        finding = %finding.id,
                        domain = %ctx.domain,
                        file = %file,
                        "removing finding referencing a file outside the review"
                    );
                }
                known
            })
            .cloned()
            .collect();

        let dropped = (before - retained.len()) as u64;
        ctx.bump("hallucinated_reference", dropped);

        if dropped == 0 {
            return Ok(HookOutcome::Unchanged(HookPayload::Artifact(artifact)));
        }

        let rebuilt = AnalysisArtifact::new(
            artifact.domain().clone(),
            retained,
            artifact.summary(),
            artifact.metadata().clone(),
        );
        Ok(HookOutcome::Replaced(HookPayload::Artifact(rebuilt)))
    }
}
