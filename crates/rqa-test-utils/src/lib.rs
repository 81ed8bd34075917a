//! Testing utilities for the RQA workspace
//!
//! Shared fixtures: a scripted generative client routed by template id,
//! guideline document writers, structured-response builders.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rqa_knowledge::{FalsePositiveRegistry, KnowledgeBase, TemplateSet};
use rqa_model::{GenerationError, GenerationRequest, GenerationResponse, MemoryStore};
use rqa_pipeline::{GenerativeClient, ReviewConfig, RunContext};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type Scripted = Result<GenerationResponse, GenerationError>;

#[derive(Default)]
struct Route {
    queue: VecDeque<Scripted>,
    fallback: Option<Scripted>,
}

/// Generative client returning canned responses, routed by template id
///
/// Routing by template keeps scripts deterministic when stages run
/// concurrently: each role (stage analysis, judging, critic, refiner) drains
/// its own queue. When a queue is empty the route's fallback answers; with
/// no fallback the call is refused, which is non-retryable and fails fast.
#[derive(Default)]
pub struct ScriptedClient {
    routes: Mutex<HashMap<String, Route>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, template: &str, response: GenerationResponse) {
        self.routes
            .lock()
            .entry(template.to_string())
            .or_default()
            .queue
            .push_back(Ok(response));
    }

    pub fn enqueue_json(&self, template: &str, value: serde_json::Value) {
        self.enqueue(template, GenerationResponse::structured(value));
    }

    pub fn enqueue_error(&self, template: &str, error: GenerationError) {
        self.routes
            .lock()
            .entry(template.to_string())
            .or_default()
            .queue
            .push_back(Err(error));
    }

    pub fn set_fallback_json(&self, template: &str, value: serde_json::Value) {
        self.routes
            .lock()
            .entry(template.to_string())
            .or_default()
            .fallback = Some(Ok(GenerationResponse::structured(value)));
    }

    pub fn set_fallback_error(&self, template: &str, error: GenerationError) {
        self.routes
            .lock()
            .entry(template.to_string())
            .or_default()
            .fallback = Some(Err(error));
    }
}

#[async_trait]
impl GenerativeClient for ScriptedClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let mut routes = self.routes.lock();
        let route = routes.entry(request.template.clone()).or_default();
        if let Some(scripted) = route.queue.pop_front() {
            return scripted;
        }
        match &route.fallback {
            Some(scripted) => scripted.clone(),
            None => Err(GenerationError::Refused(format!(
                "no scripted response for template '{}'",
                request.template
            ))),
        }
    }

    fn model_label(&self) -> Option<String> {
        Some("scripted".to_string())
    }
}

/// Write a minimal guideline document for a domain under `root`
pub fn write_guideline(root: &Path, domain: &str, rules: &[&str]) {
    let mut body = String::from("version: \"1.0\"\nsections:\n  - id: general\n    title: General\n    rules:\n");
    for rule in rules {
        body.push_str(&format!("      - {rule}\n"));
    }
    std::fs::write(root.join(format!("{domain}.yaml")), body).expect("write guideline doc");
}

/// Write guideline documents for every named domain
pub fn write_guidelines(root: &Path, domains: &[&str]) {
    for domain in domains {
        write_guideline(
            root,
            domain,
            &[
                "Never concatenate user input into queries",
                "Keep functions small and focused",
                "Prefer structured logging over print statements",
            ],
        );
    }
}

/// Run context over defaults: builtin templates, default patterns,
/// in-memory store, fresh cancellation token
pub fn run_context(config: ReviewConfig) -> RunContext {
    let knowledge = Arc::new(
        KnowledgeBase::new(&config.knowledge_root).with_strict(config.strict_knowledge),
    );
    RunContext::new(
        Arc::new(config),
        knowledge,
        Arc::new(TemplateSet::builtin()),
        Arc::new(FalsePositiveRegistry::with_defaults()),
        Arc::new(MemoryStore::new()),
        CancellationToken::new(),
    )
}

/// Structured stage report with the given findings
pub fn stage_report(summary: &str, findings: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "summary": summary, "findings": findings })
}

/// A well-evidenced finding payload
pub fn evidenced_finding(kind: &str, title: &str, file: &str, confidence: f64) -> serde_json::Value {
    json!({
        "kind": kind,
        "title": title,
        "file": file,
        "line": 10,
        "description": format!("{title} detected in {file}"),
        "recommendation": "Fix it",
        "snippet": "let q = format!(\"SELECT {}\", input);",
        "confidence": confidence,
        "confidence_reasoning": "anchored evidence"
    })
}

/// An approved critique payload
pub fn approved_critique() -> serde_json::Value {
    json!({ "verdict": "approved" })
}

/// A critique listing one deficiency per instruction
pub fn deficient_critique(instructions: &[&str]) -> serde_json::Value {
    json!({
        "verdict": "deficiencies",
        "deficiencies": instructions
            .iter()
            .map(|i| json!({ "criterion": "evidence", "instruction": i }))
            .collect::<Vec<_>>()
    })
}

/// A refiner response carrying a full replacement draft
pub fn refined_draft(content: &str) -> serde_json::Value {
    json!({ "action": "draft", "draft": content })
}
