//! Knowledge base loader with process-lifetime caching
//!
//! Documents live at `<root>/<domain>.yaml`. Each domain is read once and
//! cached for the process lifetime; the cache is read-only shared state and
//! safe across concurrent stages. Refreshing guidelines requires a restart -
//! the update cadence is owned by the external maintenance process.

use crate::error::KnowledgeError;
use crate::guideline::GuidelineSet;
use moka::sync::Cache;
use rqa_model::Domain;
use std::path::PathBuf;
use std::sync::Arc;

/// Loader and cache for domain guideline documents
#[derive(Debug)]
pub struct KnowledgeBase {
    root: PathBuf,
    strict: bool,
    cache: Cache<Domain, Arc<GuidelineSet>>,
}

impl KnowledgeBase {
    /// Strict loader rooted at a directory of `<domain>.yaml` documents
    ///
    /// Strict mode fails on a missing document; this is the production
    /// default because a pipeline cannot analyze a domain without its
    /// guidelines.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            strict: true,
            cache: Cache::new(64),
        }
    }

    /// Toggle strict mode; non-strict substitutes an empty set and warns
    #[inline]
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Root directory being read
    #[inline]
    #[must_use]
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Load a domain's guidelines, cached per domain for process lifetime
    ///
    /// # Errors
    /// Strict mode returns [`KnowledgeError::MissingDomain`] when the
    /// document does not exist; both modes surface IO and syntax failures.
    pub fn load(&self, domain: &Domain) -> Result<Arc<GuidelineSet>, KnowledgeError> {
        if let Some(cached) = self.cache.get(domain) {
            return Ok(cached);
        }

        let set = Arc::new(self.read(domain)?);
        self.cache.insert(domain.clone(), Arc::clone(&set));
        tracing::info!(
            domain = %domain,
            version = %set.version,
            rules = set.rule_count(),
            fingerprint = %set.fingerprint(),
            "loaded guideline document"
        );
        Ok(set)
    }

    /// Load every requested domain, failing on the first missing one
    ///
    /// # Errors
    /// Propagates the first [`KnowledgeError`] encountered.
    pub fn load_all(
        &self,
        domains: &[Domain],
    ) -> Result<Vec<Arc<GuidelineSet>>, KnowledgeError> {
        domains.iter().map(|domain| self.load(domain)).collect()
    }

    fn read(&self, domain: &Domain) -> Result<GuidelineSet, KnowledgeError> {
        let path = self.root.join(format!("{}.yaml", domain.name()));
        if !path.exists() {
            if self.strict {
                return Err(KnowledgeError::MissingDomain {
                    domain: domain.clone(),
                    path,
                });
            }
            tracing::warn!(
                domain = %domain,
                path = %path.display(),
                "guideline document missing, substituting empty set"
            );
            return Ok(GuidelineSet::empty(domain.clone()));
        }

        let text = std::fs::read_to_string(&path).map_err(|source| KnowledgeError::Io {
            path: path.clone(),
            source,
        })?;
        GuidelineSet::from_yaml(domain.clone(), &text, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_doc(dir: &TempDir, name: &str, version: &str) {
        let body = format!(
            "version: \"{version}\"\nsections:\n  - id: general\n    title: General\n    rules:\n      - A rule\n"
        );
        fs::write(dir.path().join(name), body).unwrap();
    }

    #[test]
    fn loads_existing_document() {
        let dir = TempDir::new().unwrap();
        write_doc(&dir, "security.yaml", "1.0");

        let kb = KnowledgeBase::new(dir.path());
        let set = kb.load(&Domain::Security).unwrap();
        assert_eq!(set.version, "1.0");
        assert_eq!(set.rule_count(), 1);
    }

    #[test]
    fn strict_mode_fails_on_missing_document() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::new(dir.path());
        let err = kb.load(&Domain::Sustainability).unwrap_err();
        assert!(matches!(err, KnowledgeError::MissingDomain { .. }));
    }

    #[test]
    fn non_strict_mode_substitutes_empty_set() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::new(dir.path()).with_strict(false);
        let set = kb.load(&Domain::Sustainability).unwrap();
        assert_eq!(set.rule_count(), 0);
    }

    #[test]
    fn cache_survives_document_deletion() {
        let dir = TempDir::new().unwrap();
        write_doc(&dir, "security.yaml", "1.0");

        let kb = KnowledgeBase::new(dir.path());
        let first = kb.load(&Domain::Security).unwrap();

        // Document changes on disk do not affect the cached snapshot.
        fs::remove_file(dir.path().join("security.yaml")).unwrap();
        let second = kb.load(&Domain::Security).unwrap();
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn load_all_fails_on_first_missing() {
        let dir = TempDir::new().unwrap();
        write_doc(&dir, "security.yaml", "1.0");

        let kb = KnowledgeBase::new(dir.path());
        let result = kb.load_all(&[Domain::Security, Domain::CodeQuality]);
        assert!(matches!(result, Err(KnowledgeError::MissingDomain { .. })));
    }

    #[test]
    fn malformed_document_is_a_syntax_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("security.yaml"), "version: [oops").unwrap();

        let kb = KnowledgeBase::new(dir.path());
        assert!(matches!(
            kb.load(&Domain::Security),
            Err(KnowledgeError::Syntax { .. })
        ));
    }
}
