//! Provider trait: the opaque model-invocation capability.
//!
//! A Provider runs one agent against a transcript and context and reports
//! what happened as an ordered list of typed run items plus the canonical
//! transcript the model now considers authoritative. How the model picks
//! tools or decides to hand off is entirely the provider's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::AgentDefinition;
use crate::context::ConversationContext;
use crate::error::ProviderError;
use crate::message::TranscriptEntry;

/// One observable thing a provider produced while running an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunItem {
    /// Text shown to the user
    Message { content: String },

    /// The agent asked for a tool; `arguments` is the raw payload
    ToolCall {
        call_id: String,
        name: String,
        arguments: String,
    },

    /// A tool finished
    ToolOutput {
        call_id: String,
        output: serde_json::Value,
    },

    /// Control moved to another agent
    Handoff {
        source_agent: String,
        target_agent: String,
    },
}

impl RunItem {
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
        }
    }

    pub fn handoff(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Handoff {
            source_agent: source.into(),
            target_agent: target.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolOutput { .. } => "tool_output",
            Self::Handoff { .. } => "handoff",
        }
    }
}

/// The successful result of running an agent once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// The final textual output of the run
    pub final_output: String,

    /// Everything produced, in order
    pub items: Vec<RunItem>,

    /// Canonical transcript after the run (input history plus new entries)
    pub transcript: Vec<TranscriptEntry>,

    /// The context the run was given, with any changes its tools made
    pub context: ConversationContext,
}

impl Invocation {
    /// The transcript to persist as the conversation's history.
    pub fn canonical_transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Whether any produced item is a handoff.
    pub fn has_handoff(&self) -> bool {
        self.items.iter().any(|i| matches!(i, RunItem::Handoff { .. }))
    }
}

/// The core Provider trait.
///
/// The orchestrator never calls this directly; every invocation goes
/// through the retrying, caching, rate-limited caller.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "scripted").
    fn name(&self) -> &str;

    /// Run `agent` once over `transcript` with `context`.
    async fn invoke(
        &self,
        agent: &AgentDefinition,
        transcript: &[TranscriptEntry],
        context: &ConversationContext,
    ) -> std::result::Result<Invocation, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_item_tagging() {
        let item = RunItem::handoff("Triage", "FAQ");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "handoff");
        assert_eq!(json["source_agent"], "Triage");
        assert_eq!(item.kind(), "handoff");
    }

    #[test]
    fn invocation_detects_handoff() {
        let mut invocation = Invocation {
            final_output: String::new(),
            items: vec![RunItem::message("hi")],
            transcript: vec![TranscriptEntry::user("hello")],
            context: ConversationContext::new(),
        };
        assert!(!invocation.has_handoff());
        invocation.items.push(RunItem::handoff("A", "B"));
        assert!(invocation.has_handoff());
        assert_eq!(invocation.canonical_transcript().len(), 1);
    }
}
