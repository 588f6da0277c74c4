//! Conversation persistence backends.
//!
//! Both backends implement `waypoint_core::ConversationStore` and keep the
//! layout `conversation_id -> {transcript, context, current_agent_name}`.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileConversationStore;
pub use in_memory::InMemoryConversationStore;
