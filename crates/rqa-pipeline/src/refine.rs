//! Bounded critic-refiner refinement loop
//!
//! `start → critique → (approved → exit) | (deficiencies → refine →
//! critique)`, with a hard iteration cap guaranteeing termination whatever
//! the critic does. Each iteration replaces the draft in full so every
//! version is independently auditable. The loop is strictly sequential and
//! exclusively owns its state and the working draft - nothing else mutates
//! them concurrently.
//!
//! Generative nondeterminism is accepted: idempotence of the critic on an
//! unchanged draft is bounded by the iteration cap, not by demanding strict
//! determinism. A stage error in either role keeps the current draft for
//! that iteration and still burns the budget, so a misbehaving model cannot
//! loop forever.

use crate::context::RunContext;
use crate::critic::{Critic, Critique};
use crate::generative::GenerativeClient;
use crate::refiner::{Refiner, RefinerAction};
use rqa_model::{ExitReason, LoopState, ReportDraft};
use std::sync::Arc;

/// What survives the loop: the final draft and how the loop exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementOutcome {
    /// Last accepted draft
    pub draft: ReportDraft,
    /// Why the loop stopped
    pub exit_reason: ExitReason,
    /// Iterations consumed
    pub iterations: u32,
}

/// The critic-refiner loop
pub struct RefinementLoop {
    critic: Critic,
    refiner: Refiner,
}

impl RefinementLoop {
    /// Loop with both roles backed by the same generative client
    #[must_use]
    pub fn new(client: Arc<dyn GenerativeClient>) -> Self {
        Self {
            critic: Critic::new(Arc::clone(&client)),
            refiner: Refiner::new(client),
        }
    }

    /// Refine the draft until approval, exhaustion or cancellation
    pub async fn run(&self, ctx: &RunContext, initial: ReportDraft) -> RefinementOutcome {
        let mut state = LoopState::new(ctx.config.max_iterations);
        let mut draft = initial;

        let exit_reason = loop {
            if ctx.is_cancelled() {
                tracing::warn!(run = %ctx.run_id, "refinement loop cancelled");
                break ExitReason::Error;
            }
            if !state.begin_iteration() {
                tracing::info!(
                    run = %ctx.run_id,
                    iterations = state.iteration,
                    "iteration budget exhausted, delivering last draft"
                );
                break ExitReason::MaxIterations;
            }

            match self.critic.critique(ctx, &draft).await {
                Ok(Critique::Approved) => {
                    state.record_critique("approved");
                    tracing::info!(
                        run = %ctx.run_id,
                        iteration = state.iteration,
                        draft_version = draft.version,
                        "critic approved the draft"
                    );
                    break ExitReason::Approved;
                }
                Ok(Critique::Deficiencies(deficiencies)) => {
                    state.record_critique(format!("{} deficiencies", deficiencies.len()));
                    tracing::info!(
                        run = %ctx.run_id,
                        iteration = state.iteration,
                        deficiencies = deficiencies.len(),
                        "critic requested refinement"
                    );

                    match self.refiner.refine(ctx, &draft, &deficiencies).await {
                        Ok(RefinerAction::Draft(content)) => {
                            draft = draft.next(content);
                        }
                        Ok(RefinerAction::Exit) => {
                            // Exit is only legitimate on an approved
                            // critique; here it is a contract violation, so
                            // the draft stays and the iteration counts.
                            tracing::warn!(
                                run = %ctx.run_id,
                                iteration = state.iteration,
                                "refiner exited against an unapproved critique, keeping draft"
                            );
                        }
                        Err(error) => {
                            tracing::warn!(
                                run = %ctx.run_id,
                                iteration = state.iteration,
                                %error,
                                "refiner failed, keeping draft for this iteration"
                            );
                        }
                    }
                }
                Err(error) => {
                    state.record_critique(format!("critic error: {error}"));
                    tracing::warn!(
                        run = %ctx.run_id,
                        iteration = state.iteration,
                        %error,
                        "critic failed, keeping draft for this iteration"
                    );
                }
            }
        };

        state.finish(exit_reason);
        metrics::histogram!("rqa_refinement_iterations").record(f64::from(state.iteration));
        metrics::counter!(
            "rqa_refinement_exits_total",
            "reason" => exit_reason.to_string()
        )
        .increment(1);

        RefinementOutcome {
            draft,
            exit_reason,
            iterations: state.iteration,
        }
    }
}
