//! Process-wide agent registry with atomic reload.
//!
//! Readers take a cheap `Arc` snapshot; `reload()` builds the replacement
//! catalog to completion before swapping the shared reference, so no reader
//! ever observes a partially loaded catalog.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::CoreError;

use super::{AgentDefinition, Catalog};

pub struct AgentRegistry {
    path: Option<PathBuf>,
    inner: RwLock<Arc<Catalog>>,
}

impl AgentRegistry {
    /// Load the registry from a catalog file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let catalog = read_catalog(path)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            inner: RwLock::new(Arc::new(catalog)),
        })
    }

    /// Build a registry around an already-parsed catalog (no backing file).
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            path: None,
            inner: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The current immutable snapshot.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.inner.read().expect("registry lock poisoned").clone()
    }

    /// Re-read the catalog file and swap the snapshot atomically.
    ///
    /// Returns the number of agents in the new catalog. On failure the old
    /// snapshot stays in place.
    pub fn reload(&self) -> Result<usize, CoreError> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| CoreError::Catalog("registry has no backing catalog file".into()))?;
        let catalog = read_catalog(path)?;
        let count = catalog.agents().len();
        *self.inner.write().expect("registry lock poisoned") = Arc::new(catalog);
        tracing::info!(agents = count, "agent catalog reloaded");
        Ok(count)
    }

    pub fn list(&self) -> Vec<AgentDefinition> {
        self.snapshot().agents().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<AgentDefinition> {
        self.snapshot().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot().contains(id)
    }

    pub fn by_capability(&self, tag: &str) -> Vec<String> {
        self.snapshot().by_capability(tag)
    }

    pub fn keywords(&self, id: &str) -> Vec<String> {
        self.snapshot().keywords(id)
    }
}

fn read_catalog(path: &Path) -> Result<Catalog, CoreError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CoreError::Catalog(format!("cannot read catalog {}: {e}", path.display()))
    })?;
    Catalog::parse(&text)
}
