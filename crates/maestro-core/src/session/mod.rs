//! Session persistence.
//!
//! Key-value by session id to a JSON document on disk, one file per
//! session under the store root. Writes are serialized per session id with
//! a per-key mutex; writers to different sessions proceed in parallel.
//! There are no cross-session transactions.

mod model;

pub use model::{PlanEntry, SessionDoc, StoredMessage, ToolBinding};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::CoreError;

pub struct SessionStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionStore {
    /// Open a store rooted at `root`, creating the directory when absent.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| CoreError::Store(format!("cannot create {}: {e}", root.display())))?;
        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn doc_path(&self, id: &str) -> Result<PathBuf, CoreError> {
        // Ids are opaque uuids; anything path-like is rejected outright.
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(CoreError::Store(format!("invalid session id '{id}'")));
        }
        Ok(self.root.join(format!("{id}.json")))
    }

    async fn key_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id.to_string()).or_default().clone()
    }

    /// Create a new session with an unguessable id and persist it.
    pub async fn create(&self) -> Result<SessionDoc, CoreError> {
        let doc = SessionDoc::new(uuid::Uuid::new_v4().to_string());
        self.put(&doc.id, &doc).await?;
        Ok(doc)
    }

    pub fn get(&self, id: &str) -> Result<Option<SessionDoc>, CoreError> {
        let path = self.doc_path(id)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::Store(format!(
                    "cannot read session {id}: {e}"
                )))
            }
        };
        let doc = serde_json::from_str(&text)
            .map_err(|e| CoreError::Store(format!("corrupt session document {id}: {e}")))?;
        Ok(Some(doc))
    }

    /// Sessions that have at least one message or one enabled agent.
    pub fn list(&self) -> Result<Vec<SessionDoc>, CoreError> {
        let mut sessions: Vec<SessionDoc> = Vec::new();
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| CoreError::Store(format!("cannot list sessions: {e}")))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match read_doc(&path) {
                Ok(doc) if !doc.is_empty() => sessions.push(doc),
                Ok(_) => {}
                Err(e) => tracing::warn!(path = %path.display(), "skipping unreadable session: {e}"),
            }
        }
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    /// Persist a document, serialized per session id.
    pub async fn put(&self, id: &str, doc: &SessionDoc) -> Result<(), CoreError> {
        let path = self.doc_path(id)?;
        let lock = self.key_lock(id).await;
        let _guard = lock.lock().await;

        let text = serde_json::to_string_pretty(doc)
            .map_err(|e| CoreError::Store(format!("cannot serialize session {id}: {e}")))?;
        // Write through a temp file so readers never see a torn document.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, text)
            .map_err(|e| CoreError::Store(format!("cannot write session {id}: {e}")))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| CoreError::Store(format!("cannot commit session {id}: {e}")))?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), CoreError> {
        let path = self.doc_path(id)?;
        let lock = self.key_lock(id).await;
        let _guard = lock.lock().await;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Store(format!("cannot delete session {id}: {e}"))),
        }
    }

    /// Delete sessions with zero messages and zero enabled agents.
    /// Running it twice does nothing the second time.
    pub async fn cleanup(&self) -> Result<usize, CoreError> {
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| CoreError::Store(format!("cannot list sessions: {e}")))?;
        let mut removed = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Ok(doc) = read_doc(&path) else { continue };
            if doc.is_empty() {
                self.delete(&doc.id).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "cleaned up empty sessions");
        }
        Ok(removed)
    }
}

fn read_doc(path: &Path) -> Result<SessionDoc, CoreError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Store(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CoreError::Store(format!("corrupt document {}: {e}", path.display())))
}
