//! Fail-open hook execution engine
//!
//! Runs the hooks registered for an interception point, in registration
//! order. A hook error is caught, logged and counted - the payload continues
//! unchanged, so a single defective hook never aborts a review. A rolling
//! window over recent outcomes raises an alarm when the error rate exceeds
//! the threshold.

use crate::context::StageContext;
use crate::hook::{Hook, HookOutcome, HookPayload, HookPoint};
use crate::metrics::GuardrailMetrics;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rolling window size for the error-rate alarm
const ERROR_WINDOW: usize = 100;

/// Error rate above which the alarm fires
const ERROR_RATE_THRESHOLD: f64 = 0.05;

/// Ordered, fail-open hook registry
pub struct HookEngine {
    hooks: Vec<Arc<dyn Hook>>,
    budget: Duration,
    window: Mutex<VecDeque<bool>>,
    alarm_active: AtomicBool,
    metrics: Arc<GuardrailMetrics>,
}

impl std::fmt::Debug for HookEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookEngine")
            .field("hooks", &self.hooks.len())
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl HookEngine {
    /// Empty engine with the default 100ms per-hook budget
    #[must_use]
    pub fn new() -> Self {
        Self {
            hooks: Vec::new(),
            budget: Duration::from_millis(100),
            window: Mutex::new(VecDeque::with_capacity(ERROR_WINDOW)),
            alarm_active: AtomicBool::new(false),
            metrics: Arc::new(GuardrailMetrics::new()),
        }
    }

    /// Override the per-hook time budget
    #[inline]
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Register a hook; execution order is registration order
    #[must_use]
    pub fn register(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Shared counters
    #[inline]
    #[must_use]
    pub fn metrics(&self) -> Arc<GuardrailMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Whether the error-rate alarm is currently raised
    #[inline]
    #[must_use]
    pub fn alarm_active(&self) -> bool {
        self.alarm_active.load(Ordering::Relaxed)
    }

    /// Number of registered hooks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook registered for `point` over the payload
    ///
    /// Always returns a payload: hook errors leave the payload as it was
    /// before the failing hook.
    pub async fn run(
        &self,
        point: HookPoint,
        ctx: &mut StageContext,
        mut payload: HookPayload,
    ) -> HookPayload {
        for hook in self.hooks.iter().filter(|h| h.point() == point) {
            let before = payload.clone();
            let start = Instant::now();

            match hook.apply(ctx, payload).await {
                Ok(HookOutcome::Unchanged(next)) => {
                    payload = next;
                    self.record_outcome(false);
                }
                Ok(HookOutcome::Replaced(next)) => {
                    tracing::debug!(hook = hook.name(), point = %point, "hook replaced payload");
                    self.metrics.record_replacement(hook.name());
                    payload = next;
                    self.record_outcome(false);
                }
                Err(error) => {
                    tracing::warn!(
                        hook = hook.name(),
                        point = %point,
                        %error,
                        "hook failed, continuing fail-open"
                    );
                    self.metrics.record_failure(hook.name());
                    payload = before;
                    self.record_outcome(true);
                }
            }

            let elapsed = start.elapsed();
            self.metrics
                .record_execution(hook.name(), elapsed.as_secs_f64() * 1000.0);
            if elapsed > self.budget {
                tracing::warn!(
                    hook = hook.name(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = self.budget.as_millis() as u64,
                    "hook exceeded time budget"
                );
                self.metrics.record_budget_overrun(hook.name());
            }
        }

        for (category, count) in ctx.drain_counters() {
            self.metrics.record_filtered(&category, count);
        }

        payload
    }

    fn record_outcome(&self, errored: bool) {
        let rate = {
            let mut window = self.window.lock();
            if window.len() == ERROR_WINDOW {
                window.pop_front();
            }
            window.push_back(errored);
            let errors = window.iter().filter(|e| **e).count();
            errors as f64 / window.len() as f64
        };

        if rate > ERROR_RATE_THRESHOLD {
            if !self.alarm_active.swap(true, Ordering::Relaxed) {
                tracing::error!(
                    error_rate = format!("{:.1}%", rate * 100.0),
                    "guardrail hook error rate exceeded threshold"
                );
                metrics::counter!("rqa_guardrail_error_rate_alarms_total").increment(1);
            }
        } else {
            self.alarm_active.store(false, Ordering::Relaxed);
        }
    }
}

impl Default for HookEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use async_trait::async_trait;
    use rqa_model::{Domain, GenerationRequest, RunId};

    struct Appender {
        name: &'static str,
        point: HookPoint,
    }

    #[async_trait]
    impl Hook for Appender {
        fn name(&self) -> &str {
            self.name
        }

        fn point(&self) -> HookPoint {
            self.point
        }

        async fn apply(
            &self,
            _ctx: &mut StageContext,
            payload: HookPayload,
        ) -> Result<HookOutcome, HookError> {
            match payload {
                HookPayload::Request(mut request) => {
                    request.prompt.push_str(self.name);
                    Ok(HookOutcome::Replaced(HookPayload::Request(request)))
                }
                other => Ok(HookOutcome::Unchanged(other)),
            }
        }
    }

    struct Exploder;

    #[async_trait]
    impl Hook for Exploder {
        fn name(&self) -> &str {
            "exploder"
        }

        fn point(&self) -> HookPoint {
            HookPoint::BeforeGeneration
        }

        async fn apply(
            &self,
            _ctx: &mut StageContext,
            _payload: HookPayload,
        ) -> Result<HookOutcome, HookError> {
            Err(HookError::Internal("boom".to_string()))
        }
    }

    fn ctx() -> StageContext {
        StageContext::new(RunId::new(), Domain::Security, "code")
    }

    #[tokio::test]
    async fn hooks_run_in_registration_order() {
        let engine = HookEngine::new()
            .register(Arc::new(Appender {
                name: "a",
                point: HookPoint::BeforeGeneration,
            }))
            .register(Arc::new(Appender {
                name: "b",
                point: HookPoint::BeforeGeneration,
            }));

        let payload = HookPayload::Request(GenerationRequest::new("t", "p:"));
        let result = engine
            .run(HookPoint::BeforeGeneration, &mut ctx(), payload)
            .await;

        match result {
            HookPayload::Request(request) => assert_eq!(request.prompt, "p:ab"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_hook_is_a_no_op() {
        let engine = HookEngine::new()
            .register(Arc::new(Exploder))
            .register(Arc::new(Appender {
                name: "after",
                point: HookPoint::BeforeGeneration,
            }));

        let payload = HookPayload::Request(GenerationRequest::new("t", "p:"));
        let result = engine
            .run(HookPoint::BeforeGeneration, &mut ctx(), payload)
            .await;

        // Exploder contributed nothing; the later hook still ran.
        match result {
            HookPayload::Request(request) => assert_eq!(request.prompt, "p:after"),
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(engine.metrics().snapshot().failures, 1);
    }

    #[tokio::test]
    async fn hooks_only_run_for_their_point() {
        let engine = HookEngine::new().register(Arc::new(Appender {
            name: "tool",
            point: HookPoint::AfterTool,
        }));

        let payload = HookPayload::Request(GenerationRequest::new("t", "p:"));
        let result = engine
            .run(HookPoint::BeforeGeneration, &mut ctx(), payload)
            .await;

        match result {
            HookPayload::Request(request) => assert_eq!(request.prompt, "p:"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_rate_alarm_fires_and_recovers() {
        let engine = HookEngine::new().register(Arc::new(Exploder));
        let payload = HookPayload::Request(GenerationRequest::new("t", "p"));

        // Every outcome is an error: rate 100% after the first run.
        for _ in 0..3 {
            let _ = engine
                .run(HookPoint::BeforeGeneration, &mut ctx(), payload.clone())
                .await;
        }
        assert!(engine.alarm_active());

        // Flood with successes until the rate falls under the threshold.
        let ok_engine = engine.register(Arc::new(Appender {
            name: "ok",
            point: HookPoint::AfterTool,
        }));
        for _ in 0..ERROR_WINDOW {
            let _ = ok_engine
                .run(HookPoint::AfterTool, &mut ctx(), payload.clone())
                .await;
        }
        assert!(!ok_engine.alarm_active());
    }

    #[tokio::test]
    async fn counters_are_merged_from_context() {
        struct Counter;

        #[async_trait]
        impl Hook for Counter {
            fn name(&self) -> &str {
                "counter"
            }

            fn point(&self) -> HookPoint {
                HookPoint::AfterTool
            }

            async fn apply(
                &self,
                ctx: &mut StageContext,
                payload: HookPayload,
            ) -> Result<HookOutcome, HookError> {
                ctx.bump("false_positive", 2);
                Ok(HookOutcome::Unchanged(payload))
            }
        }

        let engine = HookEngine::new().register(Arc::new(Counter));
        let _ = engine
            .run(
                HookPoint::AfterTool,
                &mut ctx(),
                HookPayload::Findings(vec![]),
            )
            .await;
        assert_eq!(
            engine.metrics().snapshot().filtered_count("false_positive"),
            2
        );
    }
}
