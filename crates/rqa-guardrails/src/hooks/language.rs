//! Biased and profane wording filter

use crate::context::StageContext;
use crate::error::HookError;
use crate::hook::{Hook, HookOutcome, HookPayload, HookPoint};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rqa_model::AnalysisArtifact;

static REPLACEMENTS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(obviously|clearly|of course),?\s*").expect("pattern compiles"),
            "",
        ),
        (
            Regex::new(r"(?i)\b(terrible|horrible|awful|atrocious)\b").expect("pattern compiles"),
            "problematic",
        ),
        (
            Regex::new(r"(?i)\b(stupid|idiotic|lazy|careless)\b").expect("pattern compiles"),
            "questionable",
        ),
        (
            Regex::new(r"(?i)\b(garbage|trash|crap)\b").expect("pattern compiles"),
            "low-quality",
        ),
    ]
});

fn sanitize(text: &str, replaced: &mut u64) -> String {
    let mut current = text.to_string();
    for (pattern, replacement) in REPLACEMENTS.iter() {
        let hits = pattern.find_iter(&current).count() as u64;
        if hits > 0 {
            *replaced += hits;
            current = pattern.replace_all(&current, *replacement).into_owned();
        }
    }
    current
}

/// Rewrites subjective or profane wording into neutral language
///
/// Review output is published to code authors; wording stays factual.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageFilter;

impl LanguageFilter {
    /// Create the hook
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Hook for LanguageFilter {
    fn name(&self) -> &str {
        "language_filter"
    }

    fn point(&self) -> HookPoint {
        HookPoint::AfterStage
    }

    async fn apply(
        &self,
        ctx: &mut StageContext,
        payload: HookPayload,
    ) -> Result<HookOutcome, HookError> {
        let HookPayload::Artifact(artifact) = payload else {
            return Ok(HookOutcome::Unchanged(payload));
        };

        let mut replaced = 0u64;
        let summary = sanitize(artifact.summary(), &mut replaced);
        let findings: Vec<_> = artifact
            .findings()
            .iter()
            .cloned()
            .map(|nf| {
                nf.map(|mut finding| {
                    finding.title = sanitize(&finding.title, &mut replaced);
                    finding.description = sanitize(&finding.description, &mut replaced);
                    finding.recommendation = sanitize(&finding.recommendation, &mut replaced);
                    finding
                })
            })
            .collect();

        ctx.bump("language", replaced);
        if replaced == 0 {
            return Ok(HookOutcome::Unchanged(HookPayload::Artifact(artifact)));
        }

        tracing::debug!(
            domain = %ctx.domain,
            replaced,
            "neutralized subjective wording in artifact"
        );
        let rebuilt = AnalysisArtifact::new(
            artifact.domain().clone(),
            findings,
            summary,
            artifact.metadata().clone(),
        );
        Ok(HookOutcome::Replaced(HookPayload::Artifact(rebuilt)))
    }
}
