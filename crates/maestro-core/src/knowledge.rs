//! Static knowledge catalog.
//!
//! A JSON map of key → entry. Each entry carries a human label, a
//! description, the domain keywords used for conservative matching, and
//! either inline `content` or a `path` resolved lazily relative to the
//! catalog file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug)]
pub struct KnowledgeBase {
    root: PathBuf,
    keys: Vec<String>,
    entries: HashMap<String, KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Catalog(format!("cannot read knowledge catalog {}: {e}", path.display()))
        })?;
        let root = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        Self::parse(&text, root)
    }

    pub fn parse(text: &str, root: PathBuf) -> Result<Self, CoreError> {
        // preserve_order keeps the catalog's declaration order for `keys`.
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)
            .map_err(|e| CoreError::Catalog(format!("malformed knowledge catalog: {e}")))?;

        let mut keys = Vec::with_capacity(raw.len());
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let entry: KnowledgeEntry = serde_json::from_value(value)
                .map_err(|e| CoreError::Catalog(format!("knowledge entry '{key}': {e}")))?;
            if entry.content.is_none() && entry.path.is_none() {
                return Err(CoreError::Catalog(format!(
                    "knowledge entry '{key}' has neither `content` nor `path`"
                )));
            }
            keys.push(key.clone());
            entries.insert(key, entry);
        }

        Ok(Self { root, keys, entries })
    }

    /// An empty knowledge base (no keys ever match).
    pub fn empty() -> Self {
        Self {
            root: PathBuf::from("."),
            keys: Vec::new(),
            entries: HashMap::new(),
        }
    }

    /// Keys with their display labels, in declaration order.
    pub fn keys(&self) -> Vec<(String, String)> {
        self.keys
            .iter()
            .map(|k| (k.clone(), self.entries[k].label.clone()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&KnowledgeEntry> {
        self.entries.get(key)
    }

    /// Conservative domain matching: a key is selected only when the prompt
    /// contains the key itself or one of the entry's domain keywords. Short
    /// keywords are ignored so generic words never trigger a match.
    pub fn match_keys(&self, prompt: &str) -> Vec<String> {
        let prompt_lower = prompt.to_lowercase();
        self.keys
            .iter()
            .filter(|key| {
                if prompt_lower.contains(&key.to_lowercase()) {
                    return true;
                }
                self.entries[key.as_str()]
                    .keywords
                    .iter()
                    .any(|kw| kw.len() > 3 && prompt_lower.contains(&kw.to_lowercase()))
            })
            .cloned()
            .collect()
    }

    /// First matching key, in declaration order.
    pub fn match_key(&self, prompt: &str) -> Option<String> {
        self.match_keys(prompt).into_iter().next()
    }

    /// Resolve an entry's body, reading `path` lazily when there is no
    /// inline content.
    pub fn fetch(&self, key: &str) -> Result<String, CoreError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| CoreError::Catalog(format!("unknown knowledge key '{key}'")))?;
        if let Some(content) = &entry.content {
            return Ok(content.clone());
        }
        let rel = entry.path.as_deref().unwrap_or_default();
        let full = self.root.join(rel);
        std::fs::read_to_string(&full).map_err(|e| {
            CoreError::Catalog(format!("cannot read knowledge file {}: {e}", full.display()))
        })
    }
}
