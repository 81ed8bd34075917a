//! Versioned prompt templates
//!
//! Prompt assembly is centralized here instead of being scattered across
//! call sites: templates are registered once, addressed by id, and rendered
//! with explicit parameter substitution. Rendering is strict in both
//! directions - an unknown parameter and an unfilled placeholder are both
//! errors, so a template change cannot silently ship a half-assembled
//! prompt.

use crate::error::KnowledgeError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z][a-z0-9_]*)\}").expect("placeholder regex compiles"));

/// A versioned prompt template with `{param}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    id: String,
    version: String,
    body: String,
}

impl PromptTemplate {
    /// Create a template
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            body: body.into(),
        }
    }

    /// Template id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Template version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Placeholder names declared in the body
    #[must_use]
    pub fn parameters(&self) -> BTreeSet<String> {
        PLACEHOLDER
            .captures_iter(&self.body)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Render the template with every placeholder substituted
    ///
    /// Placeholders are resolved against the body *before* substitution, so
    /// parameter values containing braces (code snippets do) cannot be
    /// mistaken for unfilled placeholders.
    ///
    /// # Errors
    /// Returns [`KnowledgeError::UnknownParameter`] for a supplied name the
    /// body does not declare and [`KnowledgeError::MissingParameter`] for a
    /// declared placeholder without a value.
    pub fn render(&self, params: &HashMap<&str, String>) -> Result<String, KnowledgeError> {
        let declared = self.parameters();

        for name in params.keys() {
            if !declared.contains(*name) {
                return Err(KnowledgeError::UnknownParameter {
                    template: self.id.clone(),
                    name: (*name).to_string(),
                });
            }
        }
        for name in &declared {
            if !params.contains_key(name.as_str()) {
                return Err(KnowledgeError::MissingParameter {
                    template: self.id.clone(),
                    name: name.clone(),
                });
            }
        }

        let mut rendered = self.body.clone();
        for (name, value) in params {
            rendered = rendered.replace(&format!("{{{name}}}"), value);
        }
        Ok(rendered)
    }
}

/// Registry of templates addressed by id
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: HashMap<String, PromptTemplate>,
}

impl TemplateSet {
    /// Empty set
    #[must_use]
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// The built-in templates for the four engine roles
    #[must_use]
    pub fn builtin() -> Self {
        let mut set = Self::empty();
        set.insert(PromptTemplate::new(
            "stage_analysis",
            "1",
            "You are a {domain} reviewer. Analyze the code context below \
             against the guidelines you were given and report every issue as \
             structured JSON matching the provided schema. Attach evidence \
             (file/line, snippet or metric) and a confidence score with a \
             short justification to every finding.\n\nCode context:\n{code}",
        ));
        set.insert(PromptTemplate::new(
            "evaluator_judgment",
            "1",
            "You are an independent reviewer judging {domain} findings. For \
             each finding below, estimate your own confidence that it is a \
             real issue, from 0.0 to 1.0, using only the stated evidence and \
             the guidelines you were given. Respond as structured JSON \
             matching the provided schema.\n\nFindings:\n{findings}",
        ));
        set.insert(PromptTemplate::new(
            "report_critic",
            "1",
            "Critique the review report below against these criteria: every \
             claim cites evidence, wording is objective, no probable false \
             positive is presented as certain, and all analyzed domains are \
             covered. If the report meets all criteria respond with verdict \
             \"approved\"; otherwise list the specific deficiencies to fix. \
             Respond as structured JSON matching the provided \
             schema.\n\nReport:\n{report}",
        ));
        set.insert(PromptTemplate::new(
            "report_refiner",
            "1",
            "Revise the review report below, applying every listed \
             deficiency. Respond as structured JSON matching the provided \
             schema, with the complete revised report - not a diff. If the \
             deficiency list is empty, signal the exit action \
             instead.\n\nDeficiencies:\n{deficiencies}\n\nReport:\n{report}",
        ));
        set
    }

    /// Register or replace a template
    pub fn insert(&mut self, template: PromptTemplate) {
        self.templates.insert(template.id().to_string(), template);
    }

    /// Look up a template by id
    ///
    /// # Errors
    /// Returns [`KnowledgeError::MissingTemplate`] for an unknown id.
    pub fn get(&self, id: &str) -> Result<&PromptTemplate, KnowledgeError> {
        self.templates
            .get(id)
            .ok_or_else(|| KnowledgeError::MissingTemplate(id.to_string()))
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}
