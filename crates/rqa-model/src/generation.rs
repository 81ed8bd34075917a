//! Generative-call boundary types
//!
//! Every generative call is an external, fallible capability. These types
//! define the request/response wire shape and the failure taxonomy; the
//! client trait and retry policy live with the pipeline. Responses are never
//! assumed referentially transparent.

use serde::{Deserialize, Serialize};

/// Request sent to the generative backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Identifier of the prompt template this request was assembled from
    pub template: String,
    /// Fully assembled prompt text
    pub prompt: String,
    /// Rendered guideline block injected ahead of the prompt, if any
    pub guidelines: Option<String>,
    /// JSON schema the structured response must satisfy, if any
    pub schema: Option<serde_json::Value>,
    /// Upper bound on response tokens
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    /// Request with prompt text only
    #[must_use]
    pub fn new(template: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            prompt: prompt.into(),
            guidelines: None,
            schema: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// With an injected guideline block
    #[inline]
    #[must_use]
    pub fn with_guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.guidelines = Some(guidelines.into());
        self
    }

    /// With a structured-output schema
    #[inline]
    #[must_use]
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Full text handed to the backend: guideline block, then prompt
    #[must_use]
    pub fn full_prompt(&self) -> String {
        match &self.guidelines {
            Some(guidelines) => format!("{guidelines}\n\n{}", self.prompt),
            None => self.prompt.clone(),
        }
    }
}

/// Response returned by the generative backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Raw response text
    pub text: String,
    /// Structured payload, when the backend already decoded one
    pub parsed: Option<serde_json::Value>,
}

impl GenerationResponse {
    /// Response from raw text
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parsed: None,
        }
    }

    /// Response from an already-structured payload
    #[must_use]
    pub fn structured(value: serde_json::Value) -> Self {
        Self {
            text: value.to_string(),
            parsed: Some(value),
        }
    }

    /// Structured payload, decoding the text when the backend did not
    ///
    /// # Errors
    /// Returns [`GenerationError::Malformed`] when the text is not valid
    /// JSON even after code-fence stripping.
    pub fn structured_payload(&self) -> Result<serde_json::Value, GenerationError> {
        if let Some(parsed) = &self.parsed {
            return Ok(parsed.clone());
        }
        parse_structured_text(&self.text)
    }
}

/// Parse structured output from generative text
///
/// Models frequently wrap JSON in markdown code fences; those are stripped
/// before decoding.
///
/// # Errors
/// Returns [`GenerationError::Malformed`] when the remaining text is not
/// valid JSON.
pub fn parse_structured_text(text: &str) -> Result<serde_json::Value, GenerationError> {
    let stripped = strip_code_fences(text.trim());
    serde_json::from_str(stripped)
        .map_err(|e| GenerationError::Malformed(format!("invalid structured output: {e}")))
}

fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json", "yaml", ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .map_or(body, str::trim_end)
        .trim()
}

/// Failure modes of a generative call
///
/// All of these are caught at the call boundary and converted into
/// stage-scoped errors - they never escape the pipeline as raw panics.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationError {
    /// The call exceeded its deadline
    #[error("generation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the deadline fired
        elapsed_ms: u64,
    },

    /// The response did not match the requested structure
    #[error("malformed output: {0}")]
    Malformed(String),

    /// The backend declined to answer
    #[error("generation refused: {0}")]
    Refused(String),

    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl GenerationError {
    /// Whether retrying the identical request can plausibly succeed
    ///
    /// Malformed and refused responses are content failures; replaying the
    /// same request wastes the retry budget.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout { .. } | GenerationError::Transport(_)
        )
    }
}
