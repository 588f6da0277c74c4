//! In-memory backend for tests and ephemeral deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use waypoint_core::error::StoreError;
use waypoint_core::{ConversationId, ConversationState, ConversationStore};

/// Process-lifetime store. Conversations are never evicted.
#[derive(Clone)]
pub struct InMemoryConversationStore {
    states: Arc<RwLock<HashMap<ConversationId, ConversationState>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<ConversationState>, StoreError> {
        Ok(self.states.read().await.get(id).cloned())
    }

    async fn save(&self, id: &ConversationId, state: ConversationState) -> Result<(), StoreError> {
        self.states.write().await.insert(id.clone(), state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{ConversationContext, TranscriptEntry};

    fn state(id: &ConversationId, agent: &str) -> ConversationState {
        ConversationState::new(id.clone(), ConversationContext::new(), agent)
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemoryConversationStore::new();
        assert!(store.get(&ConversationId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_get() {
        let store = InMemoryConversationStore::new();
        let id = ConversationId::from("c1");
        let mut s = state(&id, "Triage Agent");
        s.transcript.push(TranscriptEntry::user("hi"));
        store.save(&id, s.clone()).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap(), Some(s));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn save_replaces_wholesale() {
        let store = InMemoryConversationStore::new();
        let id = ConversationId::from("c1");
        let mut first = state(&id, "Triage Agent");
        first.transcript.push(TranscriptEntry::user("one"));
        store.save(&id, first).await.unwrap();

        let second = state(&id, "FAQ Agent");
        store.save(&id, second.clone()).await.unwrap();

        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded, second);
        assert!(loaded.transcript.is_empty());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryConversationStore::new();
        let other = store.clone();
        let id = ConversationId::from("shared");
        store.save(&id, state(&id, "A")).await.unwrap();
        assert!(other.get(&id).await.unwrap().is_some());
    }
}
