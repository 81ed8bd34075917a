//! Bounded-parallel analysis stage runner
//!
//! Executes the enabled domain stages of a plan, each wrapped by the three
//! guardrail hook points. Stages are independent - none reads another's
//! in-flight output - and run under a semaphore so external rate limits are
//! respected. A stage failure materializes as a failure artifact and never
//! aborts siblings; the runner returns only when every requested domain has
//! an outcome, which is what lets the evaluator start safely.

use crate::context::RunContext;
use crate::generative::{generate_with_retry, GenerativeClient};
use crate::request::ReviewRequest;
use crate::schema::StageReport;
use crate::stage::{StageDescriptor, StagePlan};
use rqa_guardrails::hooks::schema::SCHEMA_VIOLATIONS_KEY;
use rqa_guardrails::{HookEngine, HookPayload, HookPoint, StageContext};
use rqa_model::{
    AnalysisArtifact, ArtifactMetadata, Finding, GenerationError, GenerationRequest,
    StageArtifact, StageFailure,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Executes analysis stages under guardrails
pub struct StageRunner {
    client: Arc<dyn GenerativeClient>,
    engine: Arc<HookEngine>,
}

impl StageRunner {
    /// Runner over a generative client and hook engine
    #[must_use]
    pub fn new(client: Arc<dyn GenerativeClient>, engine: Arc<HookEngine>) -> Self {
        Self { client, engine }
    }

    /// Run every enabled stage of the plan
    ///
    /// Outcomes come back in plan order, one per enabled stage, regardless
    /// of individual successes or failures.
    pub async fn run(
        &self,
        ctx: &RunContext,
        plan: &StagePlan,
        request: &ReviewRequest,
    ) -> Vec<StageArtifact> {
        let semaphore = Arc::new(Semaphore::new(ctx.config.concurrency.max(1)));

        let stage_futures = plan.enabled().map(|(index, descriptor)| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await;
                tracing::info!(
                    run = %ctx.run_id,
                    stage = %descriptor.name,
                    index,
                    "starting analysis stage"
                );
                self.run_stage(ctx, descriptor, request).await
            }
        });

        futures::future::join_all(stage_futures).await
    }

    async fn run_stage(
        &self,
        ctx: &RunContext,
        descriptor: &StageDescriptor,
        request: &ReviewRequest,
    ) -> StageArtifact {
        let start = Instant::now();
        let fail = |reason: String, retryable: bool| {
            StageArtifact::Failed(StageFailure {
                domain: descriptor.domain.clone(),
                stage: descriptor.name.clone(),
                reason,
                retryable,
            })
        };

        if ctx.is_cancelled() {
            return fail("cancelled before start".to_string(), true);
        }

        let guidelines = match ctx.knowledge.load(&descriptor.domain) {
            Ok(set) => set,
            Err(error) => return fail(error.to_string(), false),
        };
        let template = match ctx.templates.get(&descriptor.template) {
            Ok(template) => template,
            Err(error) => return fail(error.to_string(), false),
        };

        let mut stage_ctx = StageContext::new(
            ctx.run_id,
            descriptor.domain.clone(),
            request.concatenated(),
        )
        .with_known_files(request.file_paths())
        .with_guidelines(guidelines.render())
        .with_output_schema(StageReport::schema());

        let mut findings = Vec::new();
        let mut summaries = Vec::new();

        for code in request.contexts(ctx.config.context_strategy) {
            let params = HashMap::from([
                ("domain", descriptor.domain.title()),
                ("code", code),
            ]);
            let prompt = match template.render(&params) {
                Ok(prompt) => prompt,
                Err(error) => return fail(error.to_string(), false),
            };

            match self
                .analyze_chunk(ctx, descriptor, &mut stage_ctx, prompt)
                .await
            {
                Ok(report) => {
                    summaries.push(report.summary);
                    findings.extend(
                        report
                            .findings
                            .into_iter()
                            .map(|f| f.into_finding(descriptor.domain.clone())),
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        run = %ctx.run_id,
                        stage = %descriptor.name,
                        %error,
                        "analysis stage failed"
                    );
                    return fail(error.to_string(), error.is_retryable());
                }
            }
        }

        // Finding-level guardrails: validation, known-safe filtering.
        let payload = self
            .engine
            .run(
                HookPoint::AfterTool,
                &mut stage_ctx,
                HookPayload::Findings(findings),
            )
            .await;
        let findings = match payload {
            HookPayload::Findings(findings) => findings,
            _ => Vec::new(),
        };

        let normalized = findings.into_iter().map(Finding::normalize).collect();
        let artifact = AnalysisArtifact::new(
            descriptor.domain.clone(),
            normalized,
            summaries.join("\n"),
            {
                let metadata = ArtifactMetadata::new(
                    ctx.run_id,
                    descriptor.name.clone(),
                    start.elapsed().as_millis() as u64,
                );
                match self.client.model_label() {
                    Some(model) => metadata.with_model(model),
                    None => metadata,
                }
            },
        );

        // Artifact-level guardrails: hallucinated references, wording.
        let payload = self
            .engine
            .run(
                HookPoint::AfterStage,
                &mut stage_ctx,
                HookPayload::Artifact(artifact.clone()),
            )
            .await;
        let artifact = match payload {
            HookPayload::Artifact(artifact) => artifact,
            _ => artifact,
        };

        tracing::info!(
            run = %ctx.run_id,
            stage = %descriptor.name,
            findings = artifact.findings().len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "analysis stage completed"
        );
        StageArtifact::Completed(artifact)
    }

    /// One generative call plus its request/output guardrails
    async fn analyze_chunk(
        &self,
        ctx: &RunContext,
        descriptor: &StageDescriptor,
        stage_ctx: &mut StageContext,
        prompt: String,
    ) -> Result<StageReport, GenerationError> {
        let request = GenerationRequest::new(descriptor.template.clone(), prompt)
            .with_schema(StageReport::schema());

        let payload = self
            .engine
            .run(
                HookPoint::BeforeGeneration,
                stage_ctx,
                HookPayload::Request(request),
            )
            .await;
        let request = match payload {
            HookPayload::Request(request) => request,
            _ => return Err(GenerationError::Malformed("request payload lost".to_string())),
        };

        let response =
            generate_with_retry(&self.client, &request, ctx.config.retry, &ctx.cancel).await?;
        let value = response.structured_payload()?;

        let payload = self
            .engine
            .run(
                HookPoint::AfterTool,
                stage_ctx,
                HookPayload::Structured(value),
            )
            .await;
        let value = match payload {
            HookPayload::Structured(value) => value,
            _ => return Err(GenerationError::Malformed("structured payload lost".to_string())),
        };

        if let Some(violations) = stage_ctx.meta(SCHEMA_VIOLATIONS_KEY) {
            return Err(GenerationError::Malformed(format!(
                "output violates schema: {violations}"
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| GenerationError::Malformed(format!("undecodable stage report: {e}")))
    }
}
