//! The critic role of the refinement loop

use crate::context::RunContext;
use crate::generative::{generate_with_retry, GenerativeClient};
use crate::schema::CritiqueReport;
use rqa_model::{GenerationError, GenerationRequest, ReportDraft};
use std::collections::HashMap;
use std::sync::Arc;

/// A specific, actionable deficiency the refiner must address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deficiency {
    /// Criterion the draft fails
    pub criterion: String,
    /// Instruction for the refiner
    pub instruction: String,
}

/// Critic verdict over one draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Critique {
    /// The draft meets all criteria
    Approved,
    /// The draft fails; a bounded list of deficiencies to fix
    Deficiencies(Vec<Deficiency>),
}

impl Critique {
    /// One-line summary for loop state
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Critique::Approved => "approved".to_string(),
            Critique::Deficiencies(items) => format!("{} deficiencies", items.len()),
        }
    }
}

/// Evaluates drafts against evidence, objectivity, false-positive and
/// completeness criteria
pub struct Critic {
    client: Arc<dyn GenerativeClient>,
}

impl Critic {
    /// Critic over a generative client
    #[must_use]
    pub fn new(client: Arc<dyn GenerativeClient>) -> Self {
        Self { client }
    }

    /// Critique one draft
    ///
    /// The deficiency list is truncated to the configured bound - the
    /// refiner works from a short, specific list, not an essay.
    ///
    /// # Errors
    /// Generation and parse failures surface as [`GenerationError`]; the
    /// loop treats them as a stage error for that iteration.
    pub async fn critique(
        &self,
        ctx: &RunContext,
        draft: &ReportDraft,
    ) -> Result<Critique, GenerationError> {
        let template = ctx
            .templates
            .get("report_critic")
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let params = HashMap::from([("report", draft.content.clone())]);
        let prompt = template
            .render(&params)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let request = GenerationRequest::new("report_critic", prompt)
            .with_schema(CritiqueReport::schema());
        let response =
            generate_with_retry(&self.client, &request, ctx.config.retry, &ctx.cancel).await?;
        let report: CritiqueReport = serde_json::from_value(response.structured_payload()?)
            .map_err(|e| GenerationError::Malformed(format!("undecodable critique: {e}")))?;

        match report.verdict.as_str() {
            "approved" => Ok(Critique::Approved),
            "deficiencies" => {
                if report.deficiencies.is_empty() {
                    return Err(GenerationError::Malformed(
                        "critique lists no deficiencies but is not approved".to_string(),
                    ));
                }
                let bounded: Vec<Deficiency> = report
                    .deficiencies
                    .into_iter()
                    .take(ctx.config.max_deficiencies)
                    .map(|entry| Deficiency {
                        criterion: entry.criterion,
                        instruction: entry.instruction,
                    })
                    .collect();
                Ok(Critique::Deficiencies(bounded))
            }
            other => Err(GenerationError::Malformed(format!(
                "unknown critique verdict '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critique_summaries() {
        assert_eq!(Critique::Approved.summary(), "approved");
        let critique = Critique::Deficiencies(vec![Deficiency {
            criterion: "evidence".to_string(),
            instruction: "cite line numbers".to_string(),
        }]);
        assert_eq!(critique.summary(), "1 deficiencies");
    }
}
