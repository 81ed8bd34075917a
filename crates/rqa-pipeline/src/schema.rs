//! Structured-output wire types
//!
//! The shapes generative responses must take, with JSON schemas derived and
//! attached to every request so guardrails can validate before decoding.
//! These are wire DTOs: decoding converts them into the canonical model
//! types and clamps whatever the model got creative with.

use rqa_model::{ConfidenceScore, Domain, Evidence, Finding, SourceLocation};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One metric cited by a reported finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportedMetric {
    /// Metric name
    pub name: String,
    /// Measured value
    pub value: f64,
}

/// One finding as reported by an analysis stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportedFinding {
    /// Issue kind, snake_case
    pub kind: String,
    /// Short title
    pub title: String,
    /// File path the issue lives in
    #[serde(default)]
    pub file: Option<String>,
    /// 1-based line number
    #[serde(default)]
    pub line: Option<u32>,
    /// Enclosing function name
    #[serde(default)]
    pub function: Option<String>,
    /// What is wrong
    pub description: String,
    /// How to fix it
    #[serde(default)]
    pub recommendation: String,
    /// Verbatim code excerpt
    #[serde(default)]
    pub snippet: Option<String>,
    /// Measured metric backing the finding
    #[serde(default)]
    pub metric: Option<ReportedMetric>,
    /// External advisory identifiers
    #[serde(default)]
    pub references: Vec<String>,
    /// Confidence in `[0, 1]`
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Justification for the confidence
    #[serde(default)]
    pub confidence_reasoning: Option<String>,
}

impl ReportedFinding {
    /// Convert into the canonical finding for a domain
    ///
    /// Out-of-range confidences are clamped rather than rejected; a flatly
    /// absent confidence stays absent so normalization can default it with
    /// its data-quality warning.
    #[must_use]
    pub fn into_finding(self, domain: Domain) -> Finding {
        let mut finding = Finding::new(
            domain,
            self.kind,
            self.title,
            self.description,
            self.recommendation,
        );

        if self.file.is_some() || self.function.is_some() {
            finding = finding.with_location(SourceLocation {
                file: self.file,
                line: self.line,
                function: self.function,
            });
        }
        if let Some(text) = self.snippet {
            finding = finding.with_evidence(Evidence::Snippet { text });
        }
        if let Some(metric) = self.metric {
            finding = finding.with_evidence(Evidence::Metric {
                name: metric.name,
                value: metric.value,
            });
        }
        for id in self.references {
            finding = finding.with_evidence(Evidence::Reference {
                id,
                verified: false,
            });
        }
        if let Some(value) = self.confidence {
            finding.confidence = Some(ConfidenceScore::clamped(value));
        }
        finding.confidence_reasoning = self.confidence_reasoning;
        finding
    }
}

/// Full structured output of one analysis stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageReport {
    /// Stage-level summary of the analysis
    pub summary: String,
    /// Reported findings
    #[serde(default)]
    pub findings: Vec<ReportedFinding>,
}

impl StageReport {
    /// JSON schema attached to stage requests
    #[must_use]
    pub fn schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(StageReport)).unwrap_or_default()
    }
}

/// One independent confidence assessment from the evaluator's judging call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Assessment {
    /// Identifier of the assessed finding
    pub finding_id: String,
    /// Independent confidence in `[0, 1]`
    pub confidence: f64,
}

/// Structured output of the evaluator's judging call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JudgmentReport {
    /// Assessments keyed by finding id
    #[serde(default)]
    pub assessments: Vec<Assessment>,
}

impl JudgmentReport {
    /// JSON schema attached to judging requests
    #[must_use]
    pub fn schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(JudgmentReport)).unwrap_or_default()
    }
}

/// One deficiency listed by the critic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeficiencyEntry {
    /// Criterion the report fails (evidence, objectivity, ...)
    pub criterion: String,
    /// Specific, actionable instruction for the refiner
    pub instruction: String,
}

/// Structured output of the critic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CritiqueReport {
    /// `"approved"` or `"deficiencies"`
    pub verdict: String,
    /// Deficiencies when not approved
    #[serde(default)]
    pub deficiencies: Vec<DeficiencyEntry>,
}

impl CritiqueReport {
    /// JSON schema attached to critic requests
    #[must_use]
    pub fn schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(CritiqueReport)).unwrap_or_default()
    }
}

/// Structured output of the refiner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RefinerReport {
    /// `"draft"` or `"exit"`
    pub action: String,
    /// Complete revised report when the action is `"draft"`
    #[serde(default)]
    pub draft: Option<String>,
}

impl RefinerReport {
    /// JSON schema attached to refiner requests
    #[must_use]
    pub fn schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(RefinerReport)).unwrap_or_default()
    }
}
