//! End-to-end pipeline runs over a scripted generative backend

use rqa_model::{ArtifactKey, ArtifactStore, Domain, ExitReason, GenerationError, MemoryStore};
use rqa_pipeline::{RetryPolicy, ReviewConfig, ReviewFile, ReviewPipeline, ReviewRequest};
use rqa_test_utils::{
    approved_critique, deficient_critique, evidenced_finding, refined_draft, stage_report,
    write_guidelines, ScriptedClient,
};
use std::sync::Arc;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn config(dir: &TempDir, domains: Vec<Domain>) -> ReviewConfig {
    let mut config = ReviewConfig::new(dir.path()).with_domains(domains);
    config.concurrency = 1;
    config.retry = RetryPolicy {
        max_attempts: 1,
        base_delay_ms: 1,
    };
    config
}

fn request() -> ReviewRequest {
    ReviewRequest::new()
        .with_title("Add user lookup")
        .with_file(ReviewFile::new(
            "src/db.rs",
            "fn lookup(id: &str) { query(format!(\"SELECT {id}\")); }",
        ))
}

#[tokio::test]
async fn full_run_with_approval() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    write_guidelines(dir.path(), &["security", "code_quality"]);

    let client = Arc::new(ScriptedClient::new());
    client.enqueue_json(
        "stage_analysis",
        stage_report(
            "One injection issue",
            vec![evidenced_finding(
                "sql_injection",
                "SQL injection",
                "src/db.rs",
                0.9,
            )],
        ),
    );
    client.enqueue_json(
        "stage_analysis",
        stage_report(
            "One structure issue",
            vec![serde_json::json!({
                "kind": "long_function",
                "title": "Long function",
                "file": "src/db.rs",
                "line": 1,
                "description": "Function does too much",
                "recommendation": "Split it",
                "metric": { "name": "lines", "value": 90.0 }
            })],
        ),
    );
    client.set_fallback_json("evaluator_judgment", serde_json::json!({"assessments": []}));
    client.enqueue_json("report_critic", approved_critique());

    let store = Arc::new(MemoryStore::new());
    let pipeline = ReviewPipeline::new(
        config(&dir, vec![Domain::Security, Domain::CodeQuality]),
        client,
    )
    .unwrap()
    .with_store(store.clone());

    let outcome = pipeline.run(request()).await.unwrap();

    assert_eq!(outcome.provenance.exit_reason, ExitReason::Approved);
    assert_eq!(outcome.provenance.iterations, 1);
    assert!(outcome.provenance.is_fully_validated());
    assert_eq!(outcome.stats.total, 2);
    assert!(outcome.report.content.contains("# Code Review Report"));
    assert!(outcome.report.content.contains("## Security"));
    assert!(outcome.final_document().contains("Quality state: approved"));

    // Stage artifacts, evaluation records and the draft were persisted
    // under run-namespaced keys.
    let stage_key = ArtifactKey::new(outcome.run_id, "stage", "security");
    assert!(store.load(&stage_key, None).await.is_ok());
    let records_key = ArtifactKey::new(outcome.run_id, "evaluator", "records");
    assert!(store.load(&records_key, None).await.is_ok());
    let draft_key = ArtifactKey::new(outcome.run_id, "report", "draft");
    assert_eq!(store.versions(&draft_key).await.unwrap(), vec![1]);
}

#[tokio::test]
async fn missing_producer_confidence_is_defaulted_and_persisted() {
    let dir = TempDir::new().unwrap();
    write_guidelines(dir.path(), &["code_quality"]);

    let client = Arc::new(ScriptedClient::new());
    client.enqueue_json(
        "stage_analysis",
        stage_report(
            "summary",
            vec![serde_json::json!({
                "kind": "long_function",
                "title": "Long function",
                "file": "src/db.rs",
                "line": 1,
                "description": "Function does too much",
                "recommendation": "Split it"
            })],
        ),
    );
    client.enqueue_json("report_critic", approved_critique());

    let store = Arc::new(MemoryStore::new());
    let pipeline = ReviewPipeline::new(config(&dir, vec![Domain::CodeQuality]), client)
        .unwrap()
        .with_store(store.clone());

    let outcome = pipeline.run(request()).await.unwrap();

    let stage_key = ArtifactKey::new(outcome.run_id, "stage", "code_quality");
    let persisted = store.load(&stage_key, None).await.unwrap();
    assert_eq!(persisted["status"], serde_json::json!("completed"));
    let findings = &persisted["findings"];
    assert_eq!(findings[0]["defaulted"], serde_json::json!(true));
    assert_eq!(findings[0]["confidence"], serde_json::json!(0.5));
}

#[tokio::test]
async fn failed_domain_is_reported_as_not_analyzed() {
    let dir = TempDir::new().unwrap();
    write_guidelines(dir.path(), &["security", "code_quality"]);

    let client = Arc::new(ScriptedClient::new());
    client.enqueue_error(
        "stage_analysis",
        GenerationError::Timeout { elapsed_ms: 30_000 },
    );
    client.enqueue_json(
        "stage_analysis",
        stage_report(
            "clean",
            vec![evidenced_finding("long_function", "Long function", "src/db.rs", 0.8)],
        ),
    );
    client.enqueue_json("report_critic", approved_critique());

    let pipeline = ReviewPipeline::new(
        config(&dir, vec![Domain::Security, Domain::CodeQuality]),
        client,
    )
    .unwrap();

    let outcome = pipeline.run(request()).await.unwrap();

    assert_eq!(outcome.provenance.domains_not_analyzed, vec![Domain::Security]);
    assert!(!outcome.provenance.is_fully_validated());
    assert!(outcome.report.content.contains("## Not Analyzed"));
    assert!(outcome.report.content.contains("Security: not analyzed"));
    assert!(outcome
        .final_document()
        .contains("Domains not analyzed: Security"));
}

#[tokio::test]
async fn exhausted_loop_is_surfaced_as_unverified() {
    let dir = TempDir::new().unwrap();
    write_guidelines(dir.path(), &["security"]);

    let client = Arc::new(ScriptedClient::new());
    client.set_fallback_json(
        "stage_analysis",
        stage_report(
            "one issue",
            vec![evidenced_finding("sql_injection", "SQL injection", "src/db.rs", 0.9)],
        ),
    );
    client.set_fallback_json("report_critic", deficient_critique(&["never good enough"]));
    client.set_fallback_json("report_refiner", refined_draft("slightly better report"));

    let pipeline =
        ReviewPipeline::new(config(&dir, vec![Domain::Security]), client).unwrap();

    let outcome = pipeline.run(request()).await.unwrap();

    assert_eq!(outcome.provenance.exit_reason, ExitReason::MaxIterations);
    assert_eq!(outcome.provenance.iterations, 5);
    assert_eq!(outcome.report.version, 6);
    assert!(outcome
        .final_document()
        .contains("unverified (iteration budget exhausted)"));
}

#[tokio::test]
async fn missing_guideline_domain_refuses_to_start() {
    let dir = TempDir::new().unwrap();
    write_guidelines(dir.path(), &["security"]);

    let client = Arc::new(ScriptedClient::new());
    let pipeline = ReviewPipeline::new(
        config(&dir, vec![Domain::Security, Domain::Sustainability]),
        client,
    )
    .unwrap();

    let error = pipeline.run(request()).await.unwrap_err();
    assert!(error.to_string().contains("configuration error"));
    assert!(error.to_string().contains("sustainability"));
}

#[tokio::test]
async fn cancelled_run_surfaces_cancellation() {
    let dir = TempDir::new().unwrap();
    write_guidelines(dir.path(), &["security"]);

    let client = Arc::new(ScriptedClient::new());
    let pipeline =
        ReviewPipeline::new(config(&dir, vec![Domain::Security]), client).unwrap();

    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();
    let error = pipeline
        .run_with_cancel(request(), cancel)
        .await
        .unwrap_err();
    assert!(matches!(error, rqa_pipeline::PipelineError::Cancelled));
}
