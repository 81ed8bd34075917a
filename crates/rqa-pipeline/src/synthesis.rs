//! Report synthesis
//!
//! Deterministic markdown assembly from the evaluated findings: valid
//! findings per domain, flagged findings under a "requires review" marker,
//! an explicit section for domains that were not analyzed, and run-level
//! statistics. Filtered findings are excluded but stay visible in the
//! counts. The output is draft version 1 handed to the refinement loop.

use crate::request::ReviewRequest;
use indexmap::IndexMap;
use rqa_model::{
    Domain, EvaluationRecord, EvaluationStats, FindingId, NormalizedFinding, ReportDraft,
    RunId, StageArtifact, Verdict,
};
use std::collections::HashMap;

/// Assemble the initial report draft
#[must_use]
pub fn synthesize(
    run_id: RunId,
    request: &ReviewRequest,
    artifacts: &[StageArtifact],
    records: &[EvaluationRecord],
    stats: &EvaluationStats,
) -> ReportDraft {
    let findings: HashMap<FindingId, &NormalizedFinding> = artifacts
        .iter()
        .filter_map(StageArtifact::as_completed)
        .flat_map(|a| a.findings().iter().map(|f| (f.id(), f)))
        .collect();

    // Group reportable records by domain, preserving artifact order.
    let mut by_domain: IndexMap<Domain, Vec<&EvaluationRecord>> = IndexMap::new();
    for artifact in artifacts.iter().filter_map(StageArtifact::as_completed) {
        by_domain.entry(artifact.domain().clone()).or_default();
    }
    for record in records {
        if record.verdict != Verdict::Filtered {
            by_domain
                .entry(record.domain.clone())
                .or_default()
                .push(record);
        }
    }
    for domain_records in by_domain.values_mut() {
        domain_records.sort_by(|a, b| {
            b.evaluation_score
                .partial_cmp(&a.evaluation_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.finding_id.cmp(&b.finding_id))
        });
    }

    let mut out = String::new();
    out.push_str("# Code Review Report\n\n");
    if let Some(title) = &request.title {
        out.push_str(&format!("Change: {title}\n"));
    }
    out.push_str(&format!("Run: {run_id}\n\n"));

    out.push_str("## Summary\n\n");
    out.push_str(&format!(
        "{} findings evaluated: {} valid, {} flagged for review, {} filtered. \
         Mean evaluation score {:.2}.\n\n",
        stats.total, stats.valid, stats.flagged, stats.filtered, stats.mean_score
    ));

    for (domain, domain_records) in &by_domain {
        out.push_str(&format!("## {}\n\n", domain.title()));

        let summary = artifacts
            .iter()
            .filter_map(StageArtifact::as_completed)
            .find(|a| a.domain() == domain)
            .map(|a| a.summary().trim())
            .filter(|s| !s.is_empty());
        if let Some(summary) = summary {
            out.push_str(&format!("{summary}\n\n"));
        }

        if domain_records.is_empty() {
            out.push_str("No reportable findings.\n\n");
            continue;
        }

        for record in domain_records {
            let Some(finding) = findings.get(&record.finding_id) else {
                continue;
            };
            let inner = finding.finding();
            let marker = match record.verdict {
                Verdict::Flagged => " **[requires review]**",
                _ => "",
            };
            let location = inner
                .location
                .as_ref()
                .map_or_else(|| "unanchored".to_string(), ToString::to_string);
            out.push_str(&format!(
                "- **{}**{marker} ({location}) - {}\n  Recommendation: {}\n  \
                 Confidence {:.2} ({:?}), evaluation score {:.2}.\n",
                inner.title,
                inner.description,
                inner.recommendation,
                finding.confidence().value(),
                finding.confidence().band(),
                record.evaluation_score
            ));
        }
        out.push('\n');
    }

    if !stats.domains_not_analyzed.is_empty() {
        out.push_str("## Not Analyzed\n\n");
        for artifact in artifacts {
            if let StageArtifact::Failed(failure) = artifact {
                out.push_str(&format!(
                    "- {}: not analyzed ({})\n",
                    failure.domain.title(),
                    failure.reason
                ));
            }
        }
        out.push('\n');
    }

    ReportDraft::initial(out)
}
