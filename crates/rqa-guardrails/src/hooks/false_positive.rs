//! Known-safe pattern filtering

use crate::context::StageContext;
use crate::error::HookError;
use crate::hook::{Hook, HookOutcome, HookPayload, HookPoint};
use async_trait::async_trait;
use rqa_knowledge::FalsePositiveRegistry;
use std::sync::Arc;

/// Drops findings that match a registered known-safe idiom
#[derive(Debug, Clone)]
pub struct FalsePositiveFilter {
    registry: Arc<FalsePositiveRegistry>,
}

impl FalsePositiveFilter {
    /// Filter backed by the given registry
    #[inline]
    #[must_use]
    pub fn new(registry: Arc<FalsePositiveRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Hook for FalsePositiveFilter {
    fn name(&self) -> &str {
        "false_positive_filter"
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
        let retained: Vec<_> = findings
            .into_iter()
            .filter(|finding| match self.registry.match_finding(finding) {
                Some(pattern) => {
                    tracing::info!(
                        finding = %finding.id,
                        domain = %ctx.domain,
                        pattern = %pattern.name,
                        "suppressing finding matching known-safe pattern"
                    );
                    false
                }
                None => true,
            })
            .collect();

        let dropped = (before - retained.len()) as u64;
        ctx.bump("false_positive", dropped);

        if dropped > 0 {
            Ok(HookOutcome::Replaced(HookPayload::Findings(retained)))
        } else {
            Ok(HookOutcome::Unchanged(HookPayload::Findings(retained)))
        }
    }
}
