//! Conversation persistence contract.
//!
//! The orchestrator loads one `ConversationState` at the start of a turn
//! and saves it back at the end. Backends live in `waypoint-store`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ConversationContext;
use crate::error::StoreError;
use crate::message::{ConversationId, TranscriptEntry};

/// Everything persisted between turns of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: ConversationId,

    /// Canonical transcript as returned by the last successful call
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,

    #[serde(default)]
    pub context: ConversationContext,

    pub current_agent_name: String,
}

impl ConversationState {
    pub fn new(
        conversation_id: ConversationId,
        context: ConversationContext,
        current_agent_name: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            transcript: Vec::new(),
            context,
            current_agent_name: current_agent_name.into(),
        }
    }
}

/// Key-value persistence of conversation state.
///
/// `save` fully replaces any prior state under the id.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    async fn get(&self, id: &ConversationId) -> Result<Option<ConversationState>, StoreError>;

    async fn save(&self, id: &ConversationId, state: ConversationState) -> Result<(), StoreError>;
}
