//! The review pipeline orchestrator
//!
//! Owns all per-run entities and wires the sequence together: preflight
//! guideline loading (fatal on a missing domain), the bounded-parallel
//! stage runner, the single evaluator pass, deterministic synthesis, and
//! the refinement loop. The finished report leaves with its quality
//! provenance attached - an exhausted loop or partial domain coverage is
//! surfaced, never presented as fully validated.

use crate::config::ReviewConfig;
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::evaluator::Evaluator;
use crate::generative::GenerativeClient;
use crate::refine::RefinementLoop;
use crate::request::ReviewRequest;
use crate::runner::StageRunner;
use crate::stage::StagePlan;
use crate::synthesis;
use rqa_guardrails::hooks::standard_engine;
use rqa_guardrails::HookEngine;
use rqa_knowledge::{FalsePositiveRegistry, KnowledgeBase, TemplateSet};
use rqa_model::{
    ArtifactKey, ArtifactStore, EvaluationRecord, EvaluationStats, MemoryStore,
    QualityProvenance, ReportDraft, RunId, StageArtifact,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of one complete review run
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    /// Run identity
    pub run_id: RunId,
    /// Final report draft as the loop left it
    pub report: ReportDraft,
    /// Quality state of the report
    pub provenance: QualityProvenance,
    /// Run-level evaluation statistics
    pub stats: EvaluationStats,
    /// Per-finding evaluation records
    pub records: Vec<EvaluationRecord>,
}

impl ReviewOutcome {
    /// Final document for the publishing collaborator: the report plus its
    /// provenance footer
    #[must_use]
    pub fn final_document(&self) -> String {
        let quality = if self.provenance.is_fully_validated() {
            "approved".to_string()
        } else {
            match self.provenance.exit_reason {
                rqa_model::ExitReason::Approved => {
                    "approved with partial domain coverage".to_string()
                }
                rqa_model::ExitReason::MaxIterations => {
                    "unverified (iteration budget exhausted)".to_string()
                }
                rqa_model::ExitReason::Error => "incomplete (refinement aborted)".to_string(),
            }
        };

        let mut out = self.report.content.clone();
        out.push_str("\n---\n## Review Provenance\n\n");
        out.push_str(&format!("- Quality state: {quality}\n"));
        out.push_str(&format!(
            "- Refinement iterations: {}\n",
            self.provenance.iterations
        ));
        let analyzed: Vec<String> = self
            .provenance
            .domains_analyzed
            .iter()
            .map(|d| d.title())
            .collect();
        out.push_str(&format!("- Domains analyzed: {}\n", analyzed.join(", ")));
        if !self.provenance.domains_not_analyzed.is_empty() {
            let missing: Vec<String> = self
                .provenance
                .domains_not_analyzed
                .iter()
                .map(|d| d.title())
                .collect();
            out.push_str(&format!("- Domains not analyzed: {}\n", missing.join(", ")));
        }
        out
    }
}

/// The quality-assurance review pipeline
pub struct ReviewPipeline {
    config: Arc<ReviewConfig>,
    client: Arc<dyn GenerativeClient>,
    knowledge: Arc<KnowledgeBase>,
    templates: Arc<TemplateSet>,
    registry: Arc<FalsePositiveRegistry>,
    engine: Arc<HookEngine>,
    store: Arc<dyn ArtifactStore>,
}

impl std::fmt::Debug for ReviewPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewPipeline")
            .field("domains", &self.config.domains)
            .finish_non_exhaustive()
    }
}

impl ReviewPipeline {
    /// Build a pipeline over a validated configuration
    ///
    /// Collaborators default to the standard set: strict knowledge base at
    /// the configured root, built-in templates and patterns, the standard
    /// guardrail chain, an in-memory store.
    ///
    /// # Errors
    /// Returns [`PipelineError::Configuration`] for an invalid
    /// configuration.
    pub fn new(
        config: ReviewConfig,
        client: Arc<dyn GenerativeClient>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let knowledge = Arc::new(
            KnowledgeBase::new(&config.knowledge_root).with_strict(config.strict_knowledge),
        );
        let registry = Arc::new(FalsePositiveRegistry::with_defaults());
        let engine = Arc::new(standard_engine(Arc::clone(&registry)));
        Ok(Self {
            config: Arc::new(config),
            client,
            knowledge,
            templates: Arc::new(TemplateSet::builtin()),
            registry,
            engine,
            store: Arc::new(MemoryStore::new()),
        })
    }

    /// Replace the artifact store
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    /// Replace the guardrail engine
    #[must_use]
    pub fn with_engine(mut self, engine: Arc<HookEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the false-positive registry
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<FalsePositiveRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the template set
    #[must_use]
    pub fn with_templates(mut self, templates: Arc<TemplateSet>) -> Self {
        self.templates = templates;
        self
    }

    /// Run a review to completion
    ///
    /// # Errors
    /// See [`ReviewPipeline::run_with_cancel`].
    pub async fn run(&self, request: ReviewRequest) -> Result<ReviewOutcome, PipelineError> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Run a review under an external cancellation token
    ///
    /// The token propagates to in-flight stage calls and the refinement
    /// loop; artifacts completed before cancellation remain valid.
    ///
    /// # Errors
    /// - [`PipelineError::Configuration`] when preflight fails (missing
    ///   guideline domain, invalid plan)
    /// - [`PipelineError::MissingArtifact`] when a requested domain has no
    ///   materialized outcome in front of the evaluator
    /// - [`PipelineError::Cancelled`] when cancelled before stages complete
    pub async fn run_with_cancel(
        &self,
        request: ReviewRequest,
        cancel: CancellationToken,
    ) -> Result<ReviewOutcome, PipelineError> {
        let ctx = RunContext::new(
            Arc::clone(&self.config),
            Arc::clone(&self.knowledge),
            Arc::clone(&self.templates),
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            cancel,
        );
        tracing::info!(
            run = %ctx.run_id,
            domains = ?self.config.domains,
            files = request.files.len(),
            "starting review run"
        );

        // Preflight: the pipeline cannot start without guidelines for every
        // domain it will analyze.
        self.knowledge.load_all(&self.config.domains)?;
        let plan = StagePlan::for_domains(&self.config.domains)?;

        let runner = StageRunner::new(Arc::clone(&self.client), Arc::clone(&self.engine));
        let artifacts = runner.run(&ctx, &plan, &request).await;

        if ctx.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Fail-stop: every requested domain must have a materialized
        // outcome before evaluation starts.
        for domain in plan.domains() {
            if !artifacts.iter().any(|a| a.domain() == &domain) {
                return Err(PipelineError::MissingArtifact(domain));
            }
        }
        self.persist_artifacts(&ctx, &artifacts).await;

        let evaluator = Evaluator::with_judging(Arc::clone(&self.client));
        let (records, stats) = evaluator.evaluate(&ctx, &artifacts).await?;
        self.persist(&ctx, "evaluator", "records", 1, serde_json::to_value(&records))
            .await;
        self.persist(&ctx, "evaluator", "stats", 1, serde_json::to_value(&stats))
            .await;

        let initial = synthesis::synthesize(ctx.run_id, &request, &artifacts, &records, &stats);
        self.persist(&ctx, "report", "draft", initial.version, serde_json::to_value(&initial))
            .await;

        let outcome = RefinementLoop::new(Arc::clone(&self.client))
            .run(&ctx, initial)
            .await;
        if outcome.draft.version > 1 {
            self.persist(
                &ctx,
                "report",
                "draft",
                outcome.draft.version,
                serde_json::to_value(&outcome.draft),
            )
            .await;
        }

        let provenance = QualityProvenance {
            exit_reason: outcome.exit_reason,
            iterations: outcome.iterations,
            domains_analyzed: stats.domains_evaluated.clone(),
            domains_not_analyzed: stats.domains_not_analyzed.clone(),
        };
        tracing::info!(
            run = %ctx.run_id,
            exit_reason = %provenance.exit_reason,
            iterations = provenance.iterations,
            fully_validated = provenance.is_fully_validated(),
            "review run complete"
        );

        Ok(ReviewOutcome {
            run_id: ctx.run_id,
            report: outcome.draft,
            provenance,
            stats,
            records,
        })
    }

    async fn persist_artifacts(&self, ctx: &RunContext, artifacts: &[StageArtifact]) {
        for artifact in artifacts {
            let name = artifact.domain().name().to_string();
            self.persist(ctx, "stage", &name, 1, serde_json::to_value(artifact))
                .await;
        }
    }

    /// Best-effort persistence; the in-memory run state stays authoritative
    async fn persist(
        &self,
        ctx: &RunContext,
        component: &str,
        name: &str,
        version: u32,
        payload: Result<serde_json::Value, serde_json::Error>,
    ) {
        let key = ArtifactKey::new(ctx.run_id, component, name);
        match payload {
            Ok(value) => {
                if let Err(error) = ctx.store.save(&key, version, value).await {
                    tracing::warn!(%key, version, %error, "artifact persistence failed");
                }
            }
            Err(error) => {
                tracing::warn!(%key, version, %error, "artifact serialization failed");
            }
        }
    }
}
