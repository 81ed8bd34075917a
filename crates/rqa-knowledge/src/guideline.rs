//! Versioned, domain-keyed guideline documents
//!
//! A [`GuidelineSet`] is the parsed form of one domain's YAML document. It is
//! read-only at runtime: the engine renders it into generation context and
//! scores findings against it, but never writes it.

use crate::error::KnowledgeError;
use rqa_model::{ContentDigest, Domain};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One titled group of rules inside a guideline document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineSection {
    /// Stable section identifier, e.g. `injection`
    pub id: String,
    /// Section title
    pub title: String,
    /// The rules themselves
    pub rules: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GuidelineDoc {
    version: String,
    #[serde(default)]
    sections: Vec<GuidelineSection>,
}

/// A domain's versioned guideline document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineSet {
    /// Domain the document covers
    pub domain: Domain,
    /// Document version as maintained by the owning process
    pub version: String,
    /// Rule sections in document order
    pub sections: Vec<GuidelineSection>,
}

impl GuidelineSet {
    /// Parse a YAML guideline document
    ///
    /// Expected shape:
    /// ```yaml
    /// version: "2.1"
    /// sections:
    ///   - id: injection
    ///     title: Injection & Unsafe Calls
    ///     rules:
    ///       - Never concatenate user input into queries
    /// ```
    ///
    /// # Errors
    /// Returns [`KnowledgeError::Syntax`] when the text is not valid YAML or
    /// does not match the document shape.
    pub fn from_yaml(domain: Domain, text: &str, path: &Path) -> Result<Self, KnowledgeError> {
        let doc: GuidelineDoc =
            serde_yaml::from_str(text).map_err(|e| KnowledgeError::Syntax {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self {
            domain,
            version: doc.version,
            sections: doc.sections,
        })
    }

    /// Empty set substituted for a missing document in non-strict mode
    #[must_use]
    pub fn empty(domain: Domain) -> Self {
        Self {
            domain,
            version: "0".to_string(),
            sections: Vec::new(),
        }
    }

    /// Total rule count across all sections
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.sections.iter().map(|s| s.rules.len()).sum()
    }

    /// All rules flattened in document order
    pub fn rules(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.rules.iter().map(String::as_str))
    }

    /// Content fingerprint of the canonical serialization
    #[must_use]
    pub fn fingerprint(&self) -> ContentDigest {
        let canonical = serde_yaml::to_string(self).unwrap_or_default();
        ContentDigest::compute(canonical.as_bytes())
    }

    /// Render the document into a deterministic, model-readable block
    ///
    /// Section order and rule numbering follow the document; rendering the
    /// same set always yields the same text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# {} Guidelines (version {})\n",
            self.domain.title(),
            self.version
        ));
        for section in &self.sections {
            out.push('\n');
            out.push_str(&format!("## {}\n", section.title));
            for (i, rule) in section.rules.iter().enumerate() {
                out.push_str(&format!("{}. {rule}\n", i + 1));
            }
        }
        out
    }
}
