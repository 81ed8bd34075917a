//! Structured-output schema validation

use crate::context::StageContext;
use crate::error::HookError;
use crate::hook::{Hook, HookOutcome, HookPayload, HookPoint};
use async_trait::async_trait;
use jsonschema::JSONSchema;

/// Metadata key under which violations are reported to the runner
pub const SCHEMA_VIOLATIONS_KEY: &str = "schema_violations";

/// Validates raw structured output against the request schema
///
/// Violations are recorded on the stage context under
/// [`SCHEMA_VIOLATIONS_KEY`]; the runner decides whether to treat them as
/// malformed output. The payload itself passes through so later hooks can
/// still salvage what is salvageable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidation;

impl SchemaValidation {
    /// Create the hook
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Hook for SchemaValidation {
    fn name(&self) -> &str {
        "schema_validation"
    }

    fn point(&self) -> HookPoint {
        HookPoint::AfterTool
    }

    async fn apply(
        &self,
        ctx: &mut StageContext,
        payload: HookPayload,
    ) -> Result<HookOutcome, HookError> {
        let HookPayload::Structured(value) = payload else {
            return Ok(HookOutcome::Unchanged(payload));
        };

        let Some(schema) = ctx.output_schema.clone() else {
            return Ok(HookOutcome::Unchanged(HookPayload::Structured(value)));
        };

        let compiled = JSONSchema::compile(&schema)
            .map_err(|e| HookError::InvalidInput(format!("schema does not compile: {e}")))?;

        let messages: Vec<String> = match compiled.validate(&value) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(|e| e.to_string()).collect(),
        };

        if !messages.is_empty() {
            tracing::warn!(
                domain = %ctx.domain,
                violations = messages.len(),
                "structured output violates the requested schema"
            );
            ctx.bump("schema_violations", messages.len() as u64);
            ctx.set_meta(SCHEMA_VIOLATIONS_KEY, serde_json::json!(messages));
        }

        Ok(HookOutcome::Unchanged(HookPayload::Structured(value)))
    }
}
