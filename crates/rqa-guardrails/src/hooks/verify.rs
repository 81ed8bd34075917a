//! Advisory external-identifier verification

use crate::context::StageContext;
use crate::error::HookError;
use crate::hook::{Hook, HookOutcome, HookPayload, HookPoint};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rqa_model::Evidence;
use std::sync::Arc;
use std::time::Duration;

static ADVISORY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,16}-\d{4}-\d{3,7}$").expect("pattern compiles"));

/// Checks whether an external identifier exists
///
/// Implementations typically query an advisory database over the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceVerifier: Send + Sync {
    /// Whether the identifier exists upstream
    ///
    /// # Errors
    /// Backend failures surface as [`HookError::Dependency`]; the hook
    /// degrades to "unverified" instead of failing the stage.
    async fn exists(&self, id: &str) -> Result<bool, HookError>;
}

/// Verifies advisory identifiers cited as evidence
///
/// Runs with its own timeout: a slow or unreachable backend degrades the
/// evidence to "unverified" rather than blocking the stage. Identifiers with
/// an invalid format, and identifiers the backend positively denies, are
/// removed from the finding's evidence - the finding itself is kept.
pub struct AdvisoryVerification {
    verifier: Arc<dyn ReferenceVerifier>,
    timeout: Duration,
}

impl std::fmt::Debug for AdvisoryVerification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisoryVerification")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AdvisoryVerification {
    /// Hook with the default 5s verification timeout
    #[must_use]
    pub fn new(verifier: Arc<dyn ReferenceVerifier>) -> Self {
        Self {
            verifier,
            timeout: Duration::from_secs(5),
        }
    }

    /// Override the verification timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Hook for AdvisoryVerification {
    fn name(&self) -> &str {
        "advisory_verification"
    }

    fn point(&self) -> HookPoint {
        HookPoint::AfterTool
    }

    async fn apply(
        &self,
        ctx: &mut StageContext,
        payload: HookPayload,
    ) -> Result<HookOutcome, HookError> {
        let HookPayload::Findings(mut findings) = payload else {
            return Ok(HookOutcome::Unchanged(payload));
        };

        let mut changed = false;
        let mut verified = 0u64;
        let mut removed = 0u64;
        let mut unverified = 0u64;

        for finding in &mut findings {
            let mut evidence = Vec::with_capacity(finding.evidence.len());
            for item in finding.evidence.drain(..) {
                match item {
                    Evidence::Reference { id, verified: true } => {
                        evidence.push(Evidence::Reference { id, verified: true });
                    }
                    Evidence::Reference { id, verified: false } => {
                        if !ADVISORY_ID.is_match(&id) {
                            tracing::warn!(
                                finding = %finding.id,
                                advisory = %id,
                                "removing reference with invalid identifier format"
                            );
                            removed += 1;
                            changed = true;
                            continue;
                        }
                        match tokio::time::timeout(self.timeout, self.verifier.exists(&id))
                            .await
                        {
                            Ok(Ok(true)) => {
                                verified += 1;
                                changed = true;
                                evidence.push(Evidence::Reference { id, verified: true });
                            }
                            Ok(Ok(false)) => {
                                tracing::warn!(
                                    finding = %finding.id,
                                    advisory = %id,
                                    "removing reference to nonexistent identifier"
                                );
                                removed += 1;
                                changed = true;
                            }
                            Ok(Err(error)) => {
                                tracing::debug!(
                                    advisory = %id,
                                    %error,
                                    "verification backend failed, keeping reference unverified"
                                );
                                unverified += 1;
                                evidence.push(Evidence::Reference { id, verified: false });
                            }
                            Err(_) => {
                                tracing::debug!(
                                    advisory = %id,
                                    timeout_ms = self.timeout.as_millis() as u64,
                                    "verification timed out, keeping reference unverified"
                                );
                                unverified += 1;
                                evidence.push(Evidence::Reference { id, verified: false });
                            }
                        }
                    }
                    other => evidence.push(other),
                }
            }
            finding.evidence = evidence;
        }

        ctx.bump("verified_reference", verified);
        ctx.bump("removed_reference", removed);
        ctx.bump("unverified_reference", unverified);

        if changed {
            Ok(HookOutcome::Replaced(HookPayload::Findings(findings)))
        } else {
            Ok(HookOutcome::Unchanged(HookPayload::Findings(findings)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqa_model::{Domain, Finding, RunId};

    fn finding_with_reference(id: &str) -> Finding {
        Finding::new(
            Domain::Security,
            "known_vulnerability",
            "Vulnerable dependency",
            "Dependency carries a published advisory",
            "Upgrade the dependency",
        )
        .with_evidence(Evidence::Reference {
            id: id.to_string(),
            verified: false,
        })
    }

    fn ctx() -> StageContext {
        StageContext::new(RunId::new(), Domain::Security, "code")
    }

    #[tokio::test]
    async fn existing_identifier_is_marked_verified() {
        let mut verifier = MockReferenceVerifier::new();
        verifier.expect_exists().returning(|_| Ok(true));
        let hook = AdvisoryVerification::new(Arc::new(verifier));

        let mut ctx = ctx();
        let payload = HookPayload::Findings(vec![finding_with_reference("CVE-2024-12345")]);
        let outcome = hook.apply(&mut ctx, payload).await.unwrap();
        match outcome.into_payload() {
            HookPayload::Findings(findings) => {
                assert!(matches!(
                    findings[0].evidence[0],
                    Evidence::Reference { verified: true, .. }
                ));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(ctx.counter("verified_reference"), 1);
    }

    #[tokio::test]
    async fn nonexistent_identifier_is_removed() {
        let mut verifier = MockReferenceVerifier::new();
        verifier.expect_exists().returning(|_| Ok(false));
        let hook = AdvisoryVerification::new(Arc::new(verifier));

        let mut ctx = ctx();
        let payload = HookPayload::Findings(vec![finding_with_reference("CVE-2024-99999")]);
        let outcome = hook.apply(&mut ctx, payload).await.unwrap();
        match outcome.into_payload() {
            HookPayload::Findings(findings) => {
                assert_eq!(findings.len(), 1);
                assert!(findings[0].evidence.is_empty());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(ctx.counter("removed_reference"), 1);
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_unverified() {
        let mut verifier = MockReferenceVerifier::new();
        verifier
            .expect_exists()
            .returning(|_| Err(HookError::Dependency("backend down".to_string())));
        let hook = AdvisoryVerification::new(Arc::new(verifier));

        let mut ctx = ctx();
        let payload = HookPayload::Findings(vec![finding_with_reference("CVE-2023-4567")]);
        let outcome = hook.apply(&mut ctx, payload).await.unwrap();
        match outcome.into_payload() {
            HookPayload::Findings(findings) => {
                assert!(matches!(
                    findings[0].evidence[0],
                    Evidence::Reference { verified: false, .. }
                ));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(ctx.counter("unverified_reference"), 1);
    }

    struct SlowVerifier;

    #[async_trait]
    impl ReferenceVerifier for SlowVerifier {
        async fn exists(&self, _id: &str) -> Result<bool, HookError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(true)
        }
    }

    #[tokio::test]
    async fn slow_backend_times_out_to_unverified() {
        let hook = AdvisoryVerification::new(Arc::new(SlowVerifier))
            .with_timeout(Duration::from_millis(10));

        let mut ctx = ctx();
        let payload = HookPayload::Findings(vec![finding_with_reference("CVE-2023-1111")]);
        let outcome = hook.apply(&mut ctx, payload).await.unwrap();
        match outcome.into_payload() {
            HookPayload::Findings(findings) => {
                assert!(matches!(
                    findings[0].evidence[0],
                    Evidence::Reference { verified: false, .. }
                ));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(ctx.counter("unverified_reference"), 1);
    }

    #[tokio::test]
    async fn invalid_format_is_removed_without_backend_call() {
        let mut verifier = MockReferenceVerifier::new();
        verifier.expect_exists().never();
        let hook = AdvisoryVerification::new(Arc::new(verifier));

        let mut ctx = ctx();
        let payload = HookPayload::Findings(vec![finding_with_reference("not-an-id")]);
        let outcome = hook.apply(&mut ctx, payload).await.unwrap();
        match outcome.into_payload() {
            HookPayload::Findings(findings) => assert!(findings[0].evidence.is_empty()),
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(ctx.counter("removed_reference"), 1);
    }
}
