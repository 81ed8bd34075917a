//! Knowledge base for the review engine
//!
//! Owns the read-only reference material every other component consumes:
//! - Versioned, domain-keyed guideline documents (YAML), cached for the
//!   process lifetime and rendered into deterministic prompt blocks
//! - The false-positive pattern registry used to suppress known-safe idioms
//! - Versioned prompt templates with explicit parameter substitution
//!
//! Guideline documents are owned by an external maintenance process; this
//! crate only reads, fingerprints and renders them.

pub mod error;
pub mod guideline;
pub mod loader;
pub mod patterns;
pub mod template;

pub use error::KnowledgeError;
pub use guideline::{GuidelineSection, GuidelineSet};
pub use loader::KnowledgeBase;
pub use patterns::{FalsePositivePattern, FalsePositiveRegistry};
pub use template::{PromptTemplate, TemplateSet};
