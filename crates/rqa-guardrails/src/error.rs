//! Guardrail error types

/// Failure inside a hook
///
/// The engine treats every variant fail-open: the hook becomes a no-op for
/// that invocation and the error is logged and counted.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The hook could not interpret its input
    #[error("invalid hook input: {0}")]
    InvalidInput(String),

    /// A dependency of the hook failed (verifier backend, template, ...)
    #[error("hook dependency failed: {0}")]
    Dependency(String),

    /// Internal hook defect
    #[error("hook internal error: {0}")]
    Internal(String),
}
