//! Error types for the knowledge base
//!
//! A missing guideline document for a requested domain is a configuration
//! error: the pipeline cannot start without guidelines for a domain it will
//! analyze, so the loader fails fast in strict mode.

use rqa_model::Domain;
use std::path::PathBuf;

/// Errors loading or using knowledge base material
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    /// No guideline document exists for the domain (fatal in strict mode)
    #[error("no guideline document for domain '{domain}' (expected {path})")]
    MissingDomain {
        /// Domain without a document
        domain: Domain,
        /// Path that was probed
        path: PathBuf,
    },

    /// IO failure reading a document
    #[error("io error reading {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid YAML or violates the document shape
    #[error("syntax error in {path}: {message}")]
    Syntax {
        /// Offending document
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A false-positive pattern failed to compile
    #[error("invalid false-positive pattern '{name}': {message}")]
    Pattern {
        /// Pattern name
        name: String,
        /// Compilation failure
        message: String,
    },

    /// No template registered under the id
    #[error("unknown template '{0}'")]
    MissingTemplate(String),

    /// A parameter was supplied that the template does not declare
    #[error("template '{template}' has no parameter '{name}'")]
    UnknownParameter {
        /// Template id
        template: String,
        /// Offending parameter
        name: String,
    },

    /// A declared template parameter was not supplied
    #[error("template '{template}' missing value for '{name}'")]
    MissingParameter {
        /// Template id
        template: String,
        /// Unsubstituted placeholder
        name: String,
    },
}
