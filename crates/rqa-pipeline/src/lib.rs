//! Review pipeline: stage runner, evaluator and refinement loop
//!
//! The orchestration core of the review engine:
//! - The generative-call boundary with bounded retry
//! - A statically-planned, bounded-parallel analysis stage runner wrapped
//!   by guardrail hooks
//! - The independent evaluator re-scoring every finding
//! - Deterministic report synthesis
//! - The bounded critic-refiner refinement loop
//!
//! Everything is driven through [`ReviewPipeline`]; the surrounding service
//! (webhooks, publishing, persistence backends) lives outside this
//! workspace.

pub mod config;
pub mod context;
pub mod critic;
pub mod error;
pub mod evaluator;
pub mod generative;
pub mod pipeline;
pub mod refine;
pub mod refiner;
pub mod request;
pub mod runner;
pub mod schema;
pub mod stage;
pub mod synthesis;

pub use config::{ContextStrategy, EvaluationWeights, ReviewConfig, VerdictThresholds};
pub use context::RunContext;
pub use critic::{Critic, Critique, Deficiency};
pub use error::PipelineError;
pub use evaluator::Evaluator;
pub use generative::{generate_with_retry, GenerativeClient, RetryPolicy};
pub use pipeline::{ReviewOutcome, ReviewPipeline};
pub use refine::{RefinementLoop, RefinementOutcome};
pub use refiner::{Refiner, RefinerAction};
pub use request::{ReviewFile, ReviewRequest};
pub use runner::StageRunner;
pub use schema::{CritiqueReport, JudgmentReport, RefinerReport, ReportedFinding, StageReport};
pub use stage::{StageDescriptor, StagePlan};
