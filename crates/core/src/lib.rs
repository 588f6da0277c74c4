//! # Waypoint Core
//!
//! Domain types, traits, and error definitions for the Waypoint
//! multi-agent turn orchestrator. This crate has **zero framework
//! dependencies**: it defines the domain model that every other crate
//! implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here (the model-invocation
//! capability, tools, conversation persistence). Implementations live in
//! their respective crates, so tests can swap in scripted doubles and
//! deployments can swap storage backends.

pub mod agent;
pub mod context;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentDefinition, AgentRegistry, AgentSummary, HandoffDefinition, ToolContract};
pub use context::{ContextChanges, ConversationContext};
pub use error::{Error, Result};
pub use event::{Event, EventKind, TurnMessage};
pub use message::{ConversationId, Role, ToolCallRecord, TranscriptEntry};
pub use provider::{Invocation, Provider, RunItem};
pub use store::{ConversationState, ConversationStore};
pub use tool::{Tool, ToolRegistry, ToolResult};
