//! Built-in guardrail hooks

pub mod evidence;
pub mod false_positive;
pub mod inject;
pub mod language;
pub mod reference;
pub mod schema;
pub mod verify;

pub use evidence::EvidenceRequirements;
pub use false_positive::FalsePositiveFilter;
pub use inject::GuidelineInjection;
pub use language::LanguageFilter;
pub use reference::ReferenceFilter;
pub use schema::SchemaValidation;
pub use verify::{AdvisoryVerification, ReferenceVerifier};

use crate::engine::HookEngine;
use rqa_knowledge::FalsePositiveRegistry;
use std::sync::Arc;

/// Engine with the standard hook chain for analysis stages
///
/// Order matters: request rewriting first, then structured-output
/// validation, then finding-level filters, then artifact post-processing.
#[must_use]
pub fn standard_engine(registry: Arc<FalsePositiveRegistry>) -> HookEngine {
    HookEngine::new()
        .register(Arc::new(GuidelineInjection::new()))
        .register(Arc::new(SchemaValidation::new()))
        .register(Arc::new(EvidenceRequirements::new()))
        .register(Arc::new(FalsePositiveFilter::new(registry)))
        .register(Arc::new(ReferenceFilter::new()))
        .register(Arc::new(LanguageFilter::new()))
}
