//! Turn trace records.
//!
//! Every orchestration-visible occurrence in a turn (a message, a tool
//! call or output, a handoff, a context change) becomes one immutable
//! `Event`. Events are created by the event stream builder and the
//! orchestrator only, and live as long as the turn response that owns them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// The kind of a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    ToolCall,
    ToolOutput,
    Handoff,
    ContextUpdate,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::ToolCall => "tool_call",
            Self::ToolOutput => "tool_output",
            Self::Handoff => "handoff",
            Self::ContextUpdate => "context_update",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed trace record of one occurrence within a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: EventKind,

    /// The agent the occurrence is attributed to
    pub agent: String,

    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    /// Milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl Event {
    pub fn new(kind: EventKind, agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            kind,
            agent: agent.into(),
            content: content.into(),
            metadata: None,
            timestamp: Some(Utc::now().timestamp_millis() as f64),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Convenience accessor for one metadata field.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

/// A user-visible message produced during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub content: String,
    pub agent: String,
}

impl TurnMessage {
    pub fn new(content: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            agent: agent.into(),
        }
    }
}
