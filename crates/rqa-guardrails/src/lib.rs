//! Guardrail hook framework
//!
//! Interception points around every generative call and pipeline stage:
//! - `BeforeGeneration` - rewrite the outgoing request (inject guidelines)
//! - `AfterTool` - validate and filter structured output and findings
//! - `AfterStage` - post-process a completed artifact (hallucinated
//!   references, biased wording)
//!
//! Hooks are pure transformations with no side effects beyond logging and
//! metric counters. The engine is **fail-open**: a defective hook is caught,
//! logged and counted, never allowed to abort a review; an alarm fires when
//! the rolling hook error rate exceeds 5%.

pub mod context;
pub mod engine;
pub mod error;
pub mod hook;
pub mod hooks;
pub mod metrics;

pub use context::StageContext;
pub use engine::HookEngine;
pub use error::HookError;
pub use hook::{Hook, HookOutcome, HookPayload, HookPoint};
pub use metrics::{GuardrailMetrics, MetricsSnapshot};
