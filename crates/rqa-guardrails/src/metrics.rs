//! Guardrail metric counters
//!
//! Counters are exported through the `metrics` facade and mirrored in an
//! in-process snapshot so tests and the alarm logic can read them without a
//! recorder installed.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process guardrail counters
#[derive(Debug, Default)]
pub struct GuardrailMetrics {
    executions: AtomicU64,
    failures: AtomicU64,
    replacements: AtomicU64,
    budget_overruns: AtomicU64,
    filtered: Mutex<BTreeMap<String, u64>>,
}

impl GuardrailMetrics {
    /// Fresh counters
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one hook execution
    pub fn record_execution(&self, hook: &str, duration_ms: f64) {
        self.executions.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("rqa_guardrail_executions_total", "hook" => hook.to_string())
            .increment(1);
        metrics::histogram!("rqa_guardrail_duration_ms", "hook" => hook.to_string())
            .record(duration_ms);
    }

    /// Record a fail-open hook error
    pub fn record_failure(&self, hook: &str) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("rqa_guardrail_failures_total", "hook" => hook.to_string())
            .increment(1);
    }

    /// Record a payload replacement
    pub fn record_replacement(&self, hook: &str) {
        self.replacements.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("rqa_guardrail_replacements_total", "hook" => hook.to_string())
            .increment(1);
    }

    /// Record a hook exceeding its time budget
    pub fn record_budget_overrun(&self, hook: &str) {
        self.budget_overruns.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("rqa_guardrail_budget_overruns_total", "hook" => hook.to_string())
            .increment(1);
    }

    /// Merge per-stage filter counters
    pub fn record_filtered(&self, category: &str, count: u64) {
        if count == 0 {
            return;
        }
        *self
            .filtered
            .lock()
            .entry(category.to_string())
            .or_insert(0) += count;
        metrics::counter!("rqa_guardrail_filtered_total", "category" => category.to_string())
            .increment(count);
    }

    /// Point-in-time snapshot
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            executions: self.executions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            budget_overruns: self.budget_overruns.load(Ordering::Relaxed),
            filtered: self.filtered.lock().clone(),
        }
    }
}

/// Copy of the counters at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Hook executions
    pub executions: u64,
    /// Fail-open errors
    pub failures: u64,
    /// Payload replacements
    pub replacements: u64,
    /// Budget overruns
    pub budget_overruns: u64,
    /// Filtered item counts by category
    pub filtered: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Filtered count for a category
    #[must_use]
    pub fn filtered_count(&self, category: &str) -> u64 {
        self.filtered.get(category).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recordings() {
        let m = GuardrailMetrics::new();
        m.record_execution("inject", 1.0);
        m.record_execution("inject", 2.0);
        m.record_failure("schema");
        m.record_replacement("inject");
        m.record_budget_overrun("verify");
        m.record_filtered("false_positive", 3);
        m.record_filtered("false_positive", 2);
        m.record_filtered("language", 0);

        let snap = m.snapshot();
        assert_eq!(snap.executions, 2);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.replacements, 1);
        assert_eq!(snap.budget_overruns, 1);
        assert_eq!(snap.filtered_count("false_positive"), 5);
        assert_eq!(snap.filtered_count("language"), 0);
    }
}
