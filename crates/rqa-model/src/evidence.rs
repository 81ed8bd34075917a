//! Structured evidence attached to findings

use serde::{Deserialize, Serialize};

/// Location of a finding in the reviewed code
///
/// At least one of `file` or `function` should be present for the location
/// to anchor anything; the evaluator scores an unanchored finding as having
/// no location evidence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Path of the file under review
    pub file: Option<String>,
    /// 1-based line number
    pub line: Option<u32>,
    /// Enclosing function or symbol name
    pub function: Option<String>,
}

impl SourceLocation {
    /// Location anchored to a file and line
    #[inline]
    #[must_use]
    pub fn file_line(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
            function: None,
        }
    }

    /// Location anchored to a function name
    #[inline]
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            file: None,
            line: None,
            function: Some(name.into()),
        }
    }

    /// Whether this location anchors the finding to anything concrete
    #[inline]
    #[must_use]
    pub fn is_anchored(&self) -> bool {
        self.file.is_some() || self.function.is_some()
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.file, self.line, &self.function) {
            (Some(file), Some(line), _) => write!(f, "{file}:{line}"),
            (Some(file), None, _) => write!(f, "{file}"),
            (None, _, Some(function)) => write!(f, "{function}()"),
            (None, _, None) => write!(f, "<unanchored>"),
        }
    }
}

/// A single piece of evidence supporting a finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evidence {
    /// Verbatim code excerpt
    Snippet {
        /// The quoted code
        text: String,
    },
    /// A measured value (complexity, line count, coverage, ...)
    Metric {
        /// Metric name
        name: String,
        /// Measured value
        value: f64,
    },
    /// A tool independently confirmed the finding
    ToolConfirmation {
        /// Confirming tool name
        tool: String,
    },
    /// External identifier (advisory id, rule id) with verification state
    Reference {
        /// The identifier, e.g. an advisory id
        id: String,
        /// Whether the identifier was verified to exist; `false` also covers
        /// "verification unavailable"
        verified: bool,
    },
}

impl Evidence {
    /// Whether this item is a measured metric
    #[inline]
    #[must_use]
    pub fn is_metric(&self) -> bool {
        matches!(self, Evidence::Metric { .. })
    }

    /// Whether this item is a code snippet
    #[inline]
    #[must_use]
    pub fn is_snippet(&self) -> bool {
        matches!(self, Evidence::Snippet { .. })
    }

    /// Whether this item is a tool confirmation
    #[inline]
    #[must_use]
    pub fn is_tool_confirmation(&self) -> bool {
        matches!(self, Evidence::ToolConfirmation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_line_location_is_anchored() {
        let loc = SourceLocation::file_line("src/main.rs", 42);
        assert!(loc.is_anchored());
        assert_eq!(loc.to_string(), "src/main.rs:42");
    }

    #[test]
    fn function_location_is_anchored() {
        let loc = SourceLocation::function("handle_request");
        assert!(loc.is_anchored());
        assert_eq!(loc.to_string(), "handle_request()");
    }

    #[test]
    fn empty_location_is_not_anchored() {
        assert!(!SourceLocation::default().is_anchored());
    }

    #[test]
    fn evidence_serde_uses_tagged_representation() {
        let evidence = Evidence::Metric {
            name: "cyclomatic_complexity".to_string(),
            value: 31.0,
        };
        let json = serde_json::to_value(&evidence).unwrap();
        assert_eq!(json["type"], "metric");
        assert_eq!(json["name"], "cyclomatic_complexity");
    }
}
