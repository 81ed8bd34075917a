//! Refinement loop termination and contract behavior

use rqa_model::{ExitReason, GenerationError, ReportDraft};
use rqa_pipeline::{RefinementLoop, ReviewConfig, RunContext};
use rqa_test_utils::{
    approved_critique, deficient_critique, refined_draft, run_context, ScriptedClient,
};
use std::sync::Arc;
use tempfile::TempDir;

fn context() -> (TempDir, RunContext) {
    let dir = TempDir::new().unwrap();
    let config = ReviewConfig::new(dir.path());
    let ctx = run_context(config);
    (dir, ctx)
}

fn initial_draft() -> ReportDraft {
    ReportDraft::initial("# Code Review Report\n\nDraft v1")
}

#[tokio::test]
async fn approval_on_second_iteration_stops_early() {
    let (_dir, ctx) = context();
    let client = Arc::new(ScriptedClient::new());
    client.enqueue_json("report_critic", deficient_critique(&["cite line numbers"]));
    client.enqueue_json("report_critic", approved_critique());
    client.enqueue_json("report_refiner", refined_draft("Draft v2 with line numbers"));

    let outcome = RefinementLoop::new(client).run(&ctx, initial_draft()).await;

    assert_eq!(outcome.exit_reason, ExitReason::Approved);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.draft.version, 2);
    assert_eq!(outcome.draft.content, "Draft v2 with line numbers");
}

#[tokio::test]
async fn exhaustion_returns_last_draft_after_max_iterations() {
    let (_dir, ctx) = context();
    let client = Arc::new(ScriptedClient::new());
    client.set_fallback_json("report_critic", deficient_critique(&["tighten wording"]));
    client.set_fallback_json("report_refiner", refined_draft("a little better"));

    let outcome = RefinementLoop::new(client).run(&ctx, initial_draft()).await;

    assert_eq!(outcome.exit_reason, ExitReason::MaxIterations);
    assert_eq!(outcome.iterations, ctx.config.max_iterations);
    // Five refinements on top of version 1.
    assert_eq!(outcome.draft.version, 6);
}

#[tokio::test]
async fn refiner_emitting_both_exit_and_draft_keeps_current_draft() {
    let (_dir, ctx) = context();
    let client = Arc::new(ScriptedClient::new());
    client.set_fallback_json("report_critic", deficient_critique(&["anything"]));
    client.set_fallback_json(
        "report_refiner",
        serde_json::json!({ "action": "exit", "draft": "sneaky draft" }),
    );

    let outcome = RefinementLoop::new(client).run(&ctx, initial_draft()).await;

    assert_eq!(outcome.exit_reason, ExitReason::MaxIterations);
    assert_eq!(outcome.draft.version, 1);
}

#[tokio::test]
async fn refiner_emitting_neither_keeps_current_draft() {
    let (_dir, ctx) = context();
    let client = Arc::new(ScriptedClient::new());
    client.set_fallback_json("report_critic", deficient_critique(&["anything"]));
    client.set_fallback_json("report_refiner", serde_json::json!({ "action": "draft" }));

    let outcome = RefinementLoop::new(client).run(&ctx, initial_draft()).await;

    assert_eq!(outcome.exit_reason, ExitReason::MaxIterations);
    assert_eq!(outcome.draft.version, 1);
}

#[tokio::test]
async fn refiner_exit_against_unapproved_critique_burns_the_iteration() {
    let (_dir, ctx) = context();
    let client = Arc::new(ScriptedClient::new());
    client.set_fallback_json("report_critic", deficient_critique(&["anything"]));
    client.set_fallback_json("report_refiner", serde_json::json!({ "action": "exit" }));

    let outcome = RefinementLoop::new(client).run(&ctx, initial_draft()).await;

    assert_eq!(outcome.exit_reason, ExitReason::MaxIterations);
    assert_eq!(outcome.iterations, ctx.config.max_iterations);
    assert_eq!(outcome.draft.version, 1);
}

#[tokio::test]
async fn critic_failures_still_terminate_within_budget() {
    let (_dir, ctx) = context();
    let client = Arc::new(ScriptedClient::new());
    client.set_fallback_error(
        "report_critic",
        GenerationError::Refused("cannot critique".to_string()),
    );

    let outcome = RefinementLoop::new(client).run(&ctx, initial_draft()).await;

    assert_eq!(outcome.exit_reason, ExitReason::MaxIterations);
    assert_eq!(outcome.iterations, ctx.config.max_iterations);
    assert_eq!(outcome.draft.version, 1);
}

#[tokio::test]
async fn critique_deficiency_list_is_bounded() {
    let (_dir, base_ctx) = context();
    let mut config = (*base_ctx.config).clone();
    config.max_iterations = 1;
    config.max_deficiencies = 2;
    let ctx = run_context(config);

    let client = Arc::new(ScriptedClient::new());
    client.set_fallback_json(
        "report_critic",
        deficient_critique(&["one", "two", "three", "four"]),
    );
    // The refiner receives at most two deficiencies; respond with a draft.
    client.set_fallback_json("report_refiner", refined_draft("bounded"));

    let outcome = RefinementLoop::new(client).run(&ctx, initial_draft()).await;
    assert_eq!(outcome.exit_reason, ExitReason::MaxIterations);
    assert_eq!(outcome.draft.version, 2);
}

#[tokio::test]
async fn cancellation_exits_with_error_reason() {
    let (_dir, ctx) = context();
    ctx.cancel.cancel();
    let client = Arc::new(ScriptedClient::new());

    let outcome = RefinementLoop::new(client).run(&ctx, initial_draft()).await;

    assert_eq!(outcome.exit_reason, ExitReason::Error);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.draft.version, 1);
}

#[tokio::test]
async fn approval_on_first_iteration_never_calls_the_refiner() {
    let (_dir, ctx) = context();
    let client = Arc::new(ScriptedClient::new());
    client.enqueue_json("report_critic", approved_critique());
    // No refiner route registered: a refiner call would be refused and
    // would show up as a kept-draft exhaustion instead of an approval.

    let outcome = RefinementLoop::new(client).run(&ctx, initial_draft()).await;

    assert_eq!(outcome.exit_reason, ExitReason::Approved);
    assert_eq!(outcome.iterations, 1);
}
