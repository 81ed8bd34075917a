//! False-positive pattern registry
//!
//! Known-safe code idioms - parameterized queries, sandboxed execution,
//! test fixtures - routinely trigger findings that look like violations. The
//! registry describes them so the guardrails can filter matches early and the
//! evaluator can score `false_positive_likelihood` accordingly.

use crate::error::KnowledgeError;
use once_cell::sync::Lazy;
use regex::Regex;
use rqa_model::{Domain, Evidence, Finding};
use serde::Deserialize;

/// A known-safe idiom that suppresses matching findings
#[derive(Debug, Clone)]
pub struct FalsePositivePattern {
    /// Pattern name, used in suppression reasons
    pub name: String,
    /// Restrict to one domain; `None` applies everywhere
    pub domain: Option<Domain>,
    /// Substring matched case-insensitively against the finding kind
    pub kind: String,
    /// Substrings matched case-insensitively against the description
    pub indicators: Vec<String>,
    /// Compiled pattern matched against snippet evidence
    pub code_pattern: Option<Regex>,
}

impl FalsePositivePattern {
    /// Whether the finding matches this pattern
    ///
    /// The kind must match; then either a description indicator or the code
    /// pattern must confirm. A kind-only match is not enough - that is how
    /// genuine findings of the same kind stay alive.
    #[must_use]
    pub fn matches(&self, finding: &Finding) -> bool {
        if let Some(domain) = &self.domain {
            if domain != &finding.domain {
                return false;
            }
        }

        if !finding
            .kind
            .to_lowercase()
            .contains(&self.kind.to_lowercase())
        {
            return false;
        }

        let description = finding.description.to_lowercase();
        if self
            .indicators
            .iter()
            .any(|indicator| description.contains(&indicator.to_lowercase()))
        {
            return true;
        }

        if let Some(pattern) = &self.code_pattern {
            for evidence in &finding.evidence {
                if let Evidence::Snippet { text } = evidence {
                    if pattern.is_match(text) {
                        return true;
                    }
                }
            }
        }

        false
    }
}

#[derive(Debug, Deserialize)]
struct PatternDoc {
    #[serde(default)]
    patterns: Vec<PatternEntry>,
}

#[derive(Debug, Deserialize)]
struct PatternEntry {
    name: String,
    #[serde(default)]
    domain: Option<Domain>,
    kind: String,
    #[serde(default)]
    indicators: Vec<String>,
    #[serde(default)]
    code_pattern: Option<String>,
}

static DEFAULT_PATTERNS: Lazy<Vec<FalsePositivePattern>> = Lazy::new(|| {
    vec![
        FalsePositivePattern {
            name: "parameterized_query".to_string(),
            domain: Some(Domain::Security),
            kind: "injection".to_string(),
            indicators: vec![
                "parameterized".to_string(),
                "prepared statement".to_string(),
                "bind variable".to_string(),
            ],
            code_pattern: Some(
                Regex::new(r"(?i)(prepare\s*\(|bind_param|\$\d+|:\w+\s*=>|\?\s*(,|\)))")
                    .expect("builtin pattern compiles"),
            ),
        },
        FalsePositivePattern {
            name: "sandboxed_execution".to_string(),
            domain: Some(Domain::Security),
            kind: "command".to_string(),
            indicators: vec![
                "sandbox".to_string(),
                "seccomp".to_string(),
                "isolated environment".to_string(),
            ],
            code_pattern: Some(
                Regex::new(r"(?i)(sandbox|--no-network|seccomp)")
                    .expect("builtin pattern compiles"),
            ),
        },
        FalsePositivePattern {
            name: "test_fixture_secret".to_string(),
            domain: None,
            kind: "hardcoded".to_string(),
            indicators: vec![
                "test fixture".to_string(),
                "example value".to_string(),
                "placeholder".to_string(),
            ],
            code_pattern: Some(
                Regex::new(r"(?i)(tests?/|fixture|example|dummy)")
                    .expect("builtin pattern compiles"),
            ),
        },
    ]
});

/// Registry of false-positive patterns
#[derive(Debug, Clone)]
pub struct FalsePositiveRegistry {
    patterns: Vec<FalsePositivePattern>,
}

impl FalsePositiveRegistry {
    /// Registry seeded with the built-in pattern set
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.clone(),
        }
    }

    /// Empty registry
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Parse additional patterns from a YAML document and append them
    ///
    /// Expected shape:
    /// ```yaml
    /// patterns:
    ///   - name: orm_query_builder
    ///     domain: security
    ///     kind: injection
    ///     indicators: ["query builder"]
    ///     code_pattern: "(?i)QueryBuilder"
    /// ```
    ///
    /// # Errors
    /// Returns [`KnowledgeError::Syntax`] for invalid YAML and
    /// [`KnowledgeError::Pattern`] for an uncompilable regex.
    pub fn extend_from_yaml(&mut self, text: &str) -> Result<(), KnowledgeError> {
        let doc: PatternDoc = serde_yaml::from_str(text).map_err(|e| KnowledgeError::Syntax {
            path: "false_positive_patterns.yaml".into(),
            message: e.to_string(),
        })?;

        for entry in doc.patterns {
            let code_pattern = match entry.code_pattern {
                Some(source) => {
                    Some(Regex::new(&source).map_err(|e| KnowledgeError::Pattern {
                        name: entry.name.clone(),
                        message: e.to_string(),
                    })?)
                }
                None => None,
            };
            self.patterns.push(FalsePositivePattern {
                name: entry.name,
                domain: entry.domain,
                kind: entry.kind,
                indicators: entry.indicators,
                code_pattern,
            });
        }
        Ok(())
    }

    /// First pattern matching the finding, if any
    #[must_use]
    pub fn match_finding(&self, finding: &Finding) -> Option<&FalsePositivePattern> {
        self.patterns.iter().find(|p| p.matches(finding))
    }

    /// Number of registered patterns
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for FalsePositiveRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
