//! File-backed store: the whole conversation map as one JSON object.
//!
//! Storage location defaults to `~/.waypoint/conversations.json`. The map
//! is loaded on open and rewritten on every save (temp file + rename), so
//! the file is always a complete, human-inspectable snapshot.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use waypoint_core::error::StoreError;
use waypoint_core::{ConversationId, ConversationState, ConversationStore};

pub struct FileConversationStore {
    path: PathBuf,
    states: Arc<RwLock<BTreeMap<String, ConversationState>>>,
}

impl FileConversationStore {
    /// Open the store at `path`. A missing file starts empty (it is created
    /// on first save); an unreadable or corrupt file is an error rather
    /// than silently discarded history.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let states = Self::load_from_disk(&path).await?;
        debug!(path = %path.display(), count = states.len(), "File conversation store loaded");
        Ok(Self {
            path,
            states: Arc::new(RwLock::new(states)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    async fn load_from_disk(path: &Path) -> Result<BTreeMap<String, ConversationState>, StoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            StoreError::Serialization(format!("Corrupt conversation file {}: {e}", path.display()))
        })
    }

    /// Write the full map to disk.
    async fn flush(&self, states: &BTreeMap<String, ConversationState>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Storage(format!("Failed to create store directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(states)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write store file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to replace store file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<ConversationState>, StoreError> {
        Ok(self.states.read().await.get(id.as_str()).cloned())
    }

    async fn save(&self, id: &ConversationId, state: ConversationState) -> Result<(), StoreError> {
        // Hold the write lock through the flush so saves hit disk in order.
        // The in-memory map only changes once the snapshot is on disk.
        let mut states = self.states.write().await;
        let mut next = states.clone();
        next.insert(id.as_str().to_string(), state);
        self.flush(&next).await?;
        *states = next;
        debug!(conversation_id = %id, path = %self.path.display(), "Conversation flushed");
        Ok(())
    }
}
