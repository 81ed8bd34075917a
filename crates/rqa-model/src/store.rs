//! Versioned artifact store
//!
//! Keys are namespaced by run and component. Saved payloads are immutable:
//! writing the same key and version twice is rejected; re-runs supersede by
//! writing a higher version. The in-memory implementation backs tests and
//! single-process deployments; persistent backends implement the same trait
//! outside this workspace.

use crate::id::RunId;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Run/component-namespaced store key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// Owning run
    pub run: RunId,
    /// Producing component, e.g. `stage` or `evaluator`
    pub component: String,
    /// Entry name within the component, e.g. the domain name
    pub name: String,
}

impl ArtifactKey {
    /// Create a key
    #[must_use]
    pub fn new(run: RunId, component: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            run,
            component: component.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.run, self.component, self.name)
    }
}

/// Store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Attempt to overwrite an existing version
    #[error("version {version} already exists for key '{key}'")]
    DuplicateVersion {
        /// Rendered key
        key: String,
        /// Conflicting version
        version: u32,
    },

    /// No entry for the key
    #[error("no entry for key '{0}'")]
    NotFound(String),

    /// The key exists but not at the requested version
    #[error("version {version} not found for key '{key}'")]
    VersionNotFound {
        /// Rendered key
        key: String,
        /// Requested version
        version: u32,
    },

    /// Backend-specific failure
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Versioned, namespaced artifact storage
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Save a payload under `key` at `version`
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateVersion`] when the version exists.
    async fn save(
        &self,
        key: &ArtifactKey,
        version: u32,
        payload: serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Load a payload; `None` loads the latest version
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] / [`StoreError::VersionNotFound`].
    async fn load(
        &self,
        key: &ArtifactKey,
        version: Option<u32>,
    ) -> Result<serde_json::Value, StoreError>;

    /// All saved versions for a key, ascending
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the key has no entries.
    async fn versions(&self, key: &ArtifactKey) -> Result<Vec<u32>, StoreError>;
}

/// In-memory store on a concurrent map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, BTreeMap<u32, serde_json::Value>>,
}

impl MemoryStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys
    #[inline]
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn save(
        &self,
        key: &ArtifactKey,
        version: u32,
        payload: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut versions = self.entries.entry(key.to_string()).or_default();
        if versions.contains_key(&version) {
            return Err(StoreError::DuplicateVersion {
                key: key.to_string(),
                version,
            });
        }
        versions.insert(version, payload);
        Ok(())
    }

    async fn load(
        &self,
        key: &ArtifactKey,
        version: Option<u32>,
    ) -> Result<serde_json::Value, StoreError> {
        let rendered = key.to_string();
        let versions = self
            .entries
            .get(&rendered)
            .ok_or_else(|| StoreError::NotFound(rendered.clone()))?;
        match version {
            Some(v) => versions
                .get(&v)
                .cloned()
                .ok_or(StoreError::VersionNotFound {
                    key: rendered,
                    version: v,
                }),
            None => versions
                .values()
                .next_back()
                .cloned()
                .ok_or(StoreError::NotFound(rendered)),
        }
    }

    async fn versions(&self, key: &ArtifactKey) -> Result<Vec<u32>, StoreError> {
        let rendered = key.to_string();
        let versions = self
            .entries
            .get(&rendered)
            .ok_or(StoreError::NotFound(rendered))?;
        Ok(versions.keys().copied().collect())
    }
}
