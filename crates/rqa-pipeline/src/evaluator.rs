//! Independent finding evaluator
//!
//! Runs once, after every requested domain's artifact is materialized.
//! Re-scores each finding against the domain guidelines and the
//! false-positive registry, producing one additive record per finding -
//! analysis artifacts are never mutated.
//!
//! Component scoring is deterministic except for the independent confidence
//! estimate, which comes from one judging call per artifact and degrades to
//! a deterministic evidence-based estimate when that call fails. Evaluating
//! the same artifacts against the same guideline snapshot therefore yields
//! identical records.

use crate::context::RunContext;
use crate::error::PipelineError;
use crate::generative::{generate_with_retry, GenerativeClient};
use crate::schema::JudgmentReport;
use rqa_knowledge::GuidelineSet;
use rqa_model::{
    AnalysisArtifact, Domain, EvaluationRecord, EvaluationStats, Finding, GenerationRequest,
    NormalizedFinding, StageArtifact, Verdict,
};
use std::collections::HashMap;
use std::sync::Arc;

/// False-positive likelihood floor for registry-matched findings
const REGISTRY_MATCH_LIKELIHOOD: f64 = 0.8;

/// Independent evaluator over completed stage artifacts
pub struct Evaluator {
    client: Option<Arc<dyn GenerativeClient>>,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("judging", &self.client.is_some())
            .finish()
    }
}

impl Evaluator {
    /// Deterministic evaluator without a judging backend
    #[must_use]
    pub fn new() -> Self {
        Self { client: None }
    }

    /// Evaluator with an independent judging call per artifact
    #[must_use]
    pub fn with_judging(client: Arc<dyn GenerativeClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Score every finding across every completed artifact
    ///
    /// Failed domains are carried into the statistics as "not analyzed" -
    /// they are surfaced, never silently omitted.
    ///
    /// # Errors
    /// Guideline lookup failures map onto
    /// [`PipelineError::Configuration`]; they cannot normally happen after
    /// preflight.
    pub async fn evaluate(
        &self,
        ctx: &RunContext,
        artifacts: &[StageArtifact],
    ) -> Result<(Vec<EvaluationRecord>, EvaluationStats), PipelineError> {
        let mut records = Vec::new();
        let mut evaluated = Vec::new();
        let mut not_analyzed = Vec::new();

        for artifact in artifacts {
            match artifact {
                StageArtifact::Failed(failure) => {
                    tracing::warn!(
                        run = %ctx.run_id,
                        domain = %failure.domain,
                        reason = %failure.reason,
                        "domain not analyzed, excluded from evaluation"
                    );
                    not_analyzed.push(failure.domain.clone());
                }
                StageArtifact::Completed(analysis) => {
                    evaluated.push(analysis.domain().clone());
                    let guidelines = ctx.knowledge.load(analysis.domain())?;
                    let judgments = self.judge(ctx, analysis).await;
                    for finding in analysis.findings() {
                        records.push(self.score(
                            ctx,
                            finding,
                            &guidelines,
                            judgments
                                .as_ref()
                                .and_then(|j| j.get(&finding.id().to_string()))
                                .copied(),
                        ));
                    }
                }
            }
        }

        let stats = EvaluationStats::from_records(&records, evaluated, not_analyzed);
        tracing::info!(
            run = %ctx.run_id,
            total = stats.total,
            valid = stats.valid,
            flagged = stats.flagged,
            filtered = stats.filtered,
            mean_score = format!("{:.2}", stats.mean_score),
            "evaluation complete"
        );
        Ok((records, stats))
    }

    fn score(
        &self,
        ctx: &RunContext,
        finding: &NormalizedFinding,
        guidelines: &GuidelineSet,
        independent: Option<f64>,
    ) -> EvaluationRecord {
        let inner = finding.finding();
        let weights = ctx.config.weights;
        let thresholds = ctx.config.thresholds;

        let evidence_quality = Self::evidence_quality(inner);
        let rule_overlap = Self::rule_overlap(inner, guidelines);
        // An unverifiable claim can only align with a guideline as far as
        // its evidence carries it.
        let guideline_alignment = rule_overlap * (0.5 + 0.5 * evidence_quality);

        let pattern = ctx.registry.match_finding(inner);
        let base_likelihood = Self::base_false_positive_likelihood(inner, evidence_quality);
        let false_positive_likelihood = if pattern.is_some() {
            base_likelihood.max(REGISTRY_MATCH_LIKELIHOOD)
        } else {
            base_likelihood
        };

        let independent_confidence = independent
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or_else(|| Self::independent_estimate(evidence_quality, rule_overlap));
        let confidence_alignment =
            1.0 - (finding.confidence().value() - independent_confidence).abs();

        let evaluation_score = (weights.guideline_alignment * guideline_alignment
            + weights.evidence_quality * evidence_quality
            + weights.false_positive * (1.0 - false_positive_likelihood)
            + weights.confidence_alignment * confidence_alignment)
            .clamp(0.0, 1.0);

        // A registry match is a known-safe idiom: never valid, and excluded
        // outright rather than left to the weighted sum.
        let verdict = if pattern.is_some() {
            Verdict::Filtered
        } else if evaluation_score < thresholds.filter_below {
            Verdict::Filtered
        } else if evaluation_score < thresholds.valid_at {
            Verdict::Flagged
        } else {
            Verdict::Valid
        };

        let reasoning = match pattern {
            Some(pattern) => format!(
                "matches known-safe pattern '{}'; guideline alignment {guideline_alignment:.2}, \
                 evidence quality {evidence_quality:.2}",
                pattern.name
            ),
            None => format!(
                "guideline alignment {guideline_alignment:.2}, evidence quality \
                 {evidence_quality:.2}, false-positive likelihood \
                 {false_positive_likelihood:.2}, confidence alignment {confidence_alignment:.2}"
            ),
        };

        EvaluationRecord {
            finding_id: finding.id(),
            domain: inner.domain.clone(),
            guideline_alignment,
            evidence_quality,
            false_positive_likelihood,
            confidence_alignment,
            evaluation_score,
            verdict,
            reasoning,
        }
    }

    /// Graded evidence strength; no location and no metric means zero
    fn evidence_quality(finding: &Finding) -> f64 {
        let anchored = finding.has_location();
        let has_metric = finding.has_metric();
        if !anchored && !has_metric {
            return 0.0;
        }
        let mut quality: f64 = if anchored { 0.5 } else { 0.4 };
        if has_metric || finding.has_snippet() {
            quality += 0.3;
        }
        if finding.has_tool_confirmation() {
            quality += 0.2;
        }
        quality.min(1.0)
    }

    /// Best keyword overlap between the finding and any guideline rule
    fn rule_overlap(finding: &Finding, guidelines: &GuidelineSet) -> f64 {
        if guidelines.rule_count() == 0 {
            // No rules to align against; stay neutral instead of filtering
            // everything a domain without guidelines produced.
            return 0.5;
        }

        let tokens: Vec<String> = finding
            .kind
            .split('_')
            .chain(finding.title.split_whitespace())
            .map(str::to_lowercase)
            .filter(|token| token.len() > 3)
            .collect();
        if tokens.is_empty() {
            return 0.0;
        }

        let mut best: f64 = 0.0;
        for rule in guidelines.rules() {
            let rule_lower = rule.to_lowercase();
            let matched = tokens
                .iter()
                .filter(|token| rule_lower.contains(token.as_str()))
                .count();
            best = best.max(matched as f64 / tokens.len() as f64);
        }
        best
    }

    /// Likelihood the finding is spurious, judged from evidence alone
    fn base_false_positive_likelihood(finding: &Finding, evidence_quality: f64) -> f64 {
        if evidence_quality <= f64::EPSILON {
            0.7
        } else if finding.has_tool_confirmation() {
            0.05
        } else if evidence_quality >= 0.8 {
            0.1
        } else {
            0.3
        }
    }

    /// Deterministic stand-in when no judging response is available
    fn independent_estimate(evidence_quality: f64, rule_overlap: f64) -> f64 {
        (0.15 + 0.7 * evidence_quality + 0.15 * rule_overlap).clamp(0.0, 1.0)
    }

    /// One judging call per artifact; `None` on any failure (degraded mode)
    async fn judge(
        &self,
        ctx: &RunContext,
        analysis: &AnalysisArtifact,
    ) -> Option<HashMap<String, f64>> {
        let client = self.client.as_ref()?;
        if analysis.findings().is_empty() {
            return None;
        }

        let digest = Self::findings_digest(analysis.findings());
        let template = match ctx.templates.get("evaluator_judgment") {
            Ok(template) => template,
            Err(error) => {
                tracing::warn!(%error, "judging template unavailable, using deterministic estimate");
                return None;
            }
        };
        let params = HashMap::from([
            ("domain", analysis.domain().title()),
            ("findings", digest),
        ]);
        let prompt = match template.render(&params) {
            Ok(prompt) => prompt,
            Err(error) => {
                tracing::warn!(%error, "judging prompt failed, using deterministic estimate");
                return None;
            }
        };

        let guidelines = ctx.knowledge.load(analysis.domain()).ok()?;
        let request = GenerationRequest::new("evaluator_judgment", prompt)
            .with_guidelines(guidelines.render())
            .with_schema(JudgmentReport::schema());

        let response =
            match generate_with_retry(client, &request, ctx.config.retry, &ctx.cancel).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::warn!(
                        domain = %analysis.domain(),
                        %error,
                        "judging call failed, using deterministic estimate"
                    );
                    return None;
                }
            };

        let report: JudgmentReport = match response
            .structured_payload()
            .and_then(|value| {
                serde_json::from_value(value).map_err(|e| {
                    rqa_model::GenerationError::Malformed(e.to_string())
                })
            }) {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(
                    domain = %analysis.domain(),
                    %error,
                    "judging output malformed, using deterministic estimate"
                );
                return None;
            }
        };

        Some(
            report
                .assessments
                .into_iter()
                .map(|a| (a.finding_id, a.confidence.clamp(0.0, 1.0)))
                .collect(),
        )
    }

    fn findings_digest(findings: &[NormalizedFinding]) -> String {
        findings
            .iter()
            .map(|nf| {
                let finding = nf.finding();
                let location = finding
                    .location
                    .as_ref()
                    .map_or("unanchored".to_string(), ToString::to_string);
                format!(
                    "- id: {}\n  kind: {}\n  title: {}\n  location: {location}\n  \
                     evidence_items: {}\n  description: {}",
                    finding.id,
                    finding.kind,
                    finding.title,
                    finding.evidence.len(),
                    finding.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
