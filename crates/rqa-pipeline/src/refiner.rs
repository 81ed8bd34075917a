//! The refiner role of the refinement loop

use crate::context::RunContext;
use crate::critic::Deficiency;
use crate::generative::{generate_with_retry, GenerativeClient};
use crate::schema::RefinerReport;
use rqa_model::{GenerationError, GenerationRequest, ReportDraft};
use std::collections::HashMap;
use std::sync::Arc;

/// What the refiner did with its turn
///
/// Exactly one of the two, never both: a response carrying a draft together
/// with the exit action - or neither - is malformed and the loop keeps the
/// current draft for that iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefinerAction {
    /// Terminate the loop without a new draft
    Exit,
    /// Complete replacement draft content
    Draft(String),
}

/// Applies critique deficiencies to produce a full replacement draft
pub struct Refiner {
    client: Arc<dyn GenerativeClient>,
}

impl Refiner {
    /// Refiner over a generative client
    #[must_use]
    pub fn new(client: Arc<dyn GenerativeClient>) -> Self {
        Self { client }
    }

    /// Apply the deficiencies to the draft
    ///
    /// # Errors
    /// Generation failures, undecodable output, and exit-xor-draft contract
    /// violations all surface as [`GenerationError`].
    pub async fn refine(
        &self,
        ctx: &RunContext,
        draft: &ReportDraft,
        deficiencies: &[Deficiency],
    ) -> Result<RefinerAction, GenerationError> {
        let template = ctx
            .templates
            .get("report_refiner")
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let rendered_deficiencies = if deficiencies.is_empty() {
            "(none)".to_string()
        } else {
            deficiencies
                .iter()
                .enumerate()
                .map(|(i, d)| format!("{}. [{}] {}", i + 1, d.criterion, d.instruction))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let params = HashMap::from([
            ("report", draft.content.clone()),
            ("deficiencies", rendered_deficiencies),
        ]);
        let prompt = template
            .render(&params)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let request = GenerationRequest::new("report_refiner", prompt)
            .with_schema(RefinerReport::schema());
        let response =
            generate_with_retry(&self.client, &request, ctx.config.retry, &ctx.cancel).await?;
        let report: RefinerReport = serde_json::from_value(response.structured_payload()?)
            .map_err(|e| GenerationError::Malformed(format!("undecodable refinement: {e}")))?;

        match (report.action.as_str(), report.draft) {
            ("exit", None) => Ok(RefinerAction::Exit),
            ("exit", Some(_)) => Err(GenerationError::Malformed(
                "refiner both exited and produced a draft".to_string(),
            )),
            ("draft", Some(content)) if !content.trim().is_empty() => {
                Ok(RefinerAction::Draft(content))
            }
            ("draft", _) => Err(GenerationError::Malformed(
                "refiner signalled a draft but produced none".to_string(),
            )),
            (other, _) => Err(GenerationError::Malformed(format!(
                "unknown refiner action '{other}'"
            ))),
        }
    }
}
