//! Guideline injection before generation

use crate::context::StageContext;
use crate::error::HookError;
use crate::hook::{Hook, HookOutcome, HookPayload, HookPoint};
use async_trait::async_trait;

/// Injects the rendered guideline block into the outgoing request
///
/// The block comes from the stage context; a request that already carries
/// one keeps it (a caller-supplied block wins over the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidelineInjection;

impl GuidelineInjection {
    /// Create the hook
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Hook for GuidelineInjection {
    fn name(&self) -> &str {
        "guideline_injection"
    }

    fn point(&self) -> HookPoint {
        HookPoint::BeforeGeneration
    }

    async fn apply(
        &self,
        ctx: &mut StageContext,
        payload: HookPayload,
    ) -> Result<HookOutcome, HookError> {
        match payload {
            HookPayload::Request(mut request) if request.guidelines.is_none() => {
                match &ctx.guidelines {
                    Some(guidelines) => {
                        request.guidelines = Some(guidelines.clone());
                        Ok(HookOutcome::Replaced(HookPayload::Request(request)))
                    }
                    None => Ok(HookOutcome::Unchanged(HookPayload::Request(request))),
                }
            }
            other => Ok(HookOutcome::Unchanged(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqa_model::{Domain, GenerationRequest, RunId};

    fn ctx_with_guidelines() -> StageContext {
        StageContext::new(RunId::new(), Domain::Security, "code")
            .with_guidelines("# Security Guidelines (version 1)")
    }

    #[tokio::test]
    async fn injects_when_absent() {
        let hook = GuidelineInjection::new();
        let payload = HookPayload::Request(GenerationRequest::new("t", "analyze"));
        let outcome = hook
            .apply(&mut ctx_with_guidelines(), payload)
            .await
            .unwrap();
        match outcome {
            HookOutcome::Replaced(HookPayload::Request(request)) => {
                assert!(request.guidelines.unwrap().starts_with("# Security"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn keeps_existing_guidelines() {
        let hook = GuidelineInjection::new();
        let payload = HookPayload::Request(
            GenerationRequest::new("t", "analyze").with_guidelines("custom"),
        );
        let outcome = hook
            .apply(&mut ctx_with_guidelines(), payload)
            .await
            .unwrap();
        match outcome {
            HookOutcome::Unchanged(HookPayload::Request(request)) => {
                assert_eq!(request.guidelines.as_deref(), Some("custom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn passes_through_other_payloads() {
        let hook = GuidelineInjection::new();
        let outcome = hook
            .apply(&mut ctx_with_guidelines(), HookPayload::Findings(vec![]))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            HookOutcome::Unchanged(HookPayload::Findings(_))
        ));
    }
}
