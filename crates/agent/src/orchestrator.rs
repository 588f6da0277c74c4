//! The turn state machine.
//!
//! One call to [`Orchestrator::handle_turn`] runs a single user turn:
//!
//! ```text
//! NEW_CONVERSATION → ROUTE → PROCESS_ITEMS → MAYBE_FOLLOWUP → DIFF_CONTEXT → PERSIST
//! ```
//!
//! Model failures never escape a turn: the caller degrades them to a
//! fallback apology. Only storage failures are returned as errors.
//!
//! Turns on the same conversation id are serialized through a per-id
//! async mutex, so the load/modify/save of conversation state never loses
//! an update. Turns on different ids run in parallel.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use waypoint_core::{
    AgentDefinition, AgentRegistry, AgentSummary, ConversationContext, ConversationId,
    ConversationState, ConversationStore, Event, EventKind, Result, RunItem, TranscriptEntry,
    TurnMessage,
};
use waypoint_providers::{CallResult, RetryingCachingCaller};

use crate::stream::{EventStreamBuilder, TurnTrace};

/// Produces the context of a brand-new conversation.
pub trait ContextInitializer: Send + Sync {
    fn initial_context(&self) -> ConversationContext;
}

/// Incoming turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl TurnRequest {
    pub fn new(conversation_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Everything the client needs to render one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub conversation_id: String,
    pub current_agent: String,
    pub messages: Vec<TurnMessage>,
    pub events: Vec<Event>,
    pub context: ConversationContext,
    pub agents: Vec<AgentSummary>,
}

impl TurnResponse {
    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    caller: Arc<RetryingCachingCaller>,
    store: Arc<dyn ConversationStore>,
    initializer: Arc<dyn ContextInitializer>,
    stream: EventStreamBuilder,
    turn_locks: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        caller: Arc<RetryingCachingCaller>,
        store: Arc<dyn ConversationStore>,
        initializer: Arc<dyn ContextInitializer>,
        stream: EventStreamBuilder,
    ) -> Self {
        Self {
            registry,
            caller,
            store,
            initializer,
            stream,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn caller(&self) -> &Arc<RetryingCachingCaller> {
        &self.caller
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Run one turn.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse> {
        let supplied = request
            .conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ConversationId::from);

        let Some(id) = supplied else {
            return self.start_conversation(&request.message).await;
        };

        let lock = self.turn_lock(&id);
        let guard = lock.lock().await;

        let result = match self.store.get(&id).await {
            Ok(Some(state)) => self.run_turn(state, &request.message).await,
            Ok(None) => {
                debug!(conversation_id = %id, "Unknown conversation, starting a new one");
                self.start_conversation(&request.message).await
            }
            Err(e) => Err(e.into()),
        };

        self.release_turn_lock(&id, &lock);
        drop(guard);
        result
    }

    /// NEW_CONVERSATION: fresh id, fresh context, default agent.
    async fn start_conversation(&self, message: &str) -> Result<TurnResponse> {
        let id = ConversationId::new();
        let state = ConversationState::new(
            id.clone(),
            self.initializer.initial_context(),
            self.registry.default_agent().name.clone(),
        );
        info!(conversation_id = %id, agent = %state.current_agent_name, "New conversation");

        if message.trim().is_empty() {
            let response = self.response(&state, TurnTrace::default());
            self.persist(state).await?;
            return Ok(response);
        }

        self.run_turn(state, message).await
    }

    async fn run_turn(&self, mut state: ConversationState, message: &str) -> Result<TurnResponse> {
        // ROUTE
        let agent = self.registry.resolve(&state.current_agent_name);
        state.current_agent_name = agent.name.clone();
        let before = state.context.clone();

        let mut transcript = state.transcript.clone();
        transcript.push(TranscriptEntry::user(message));

        let primary = match self.caller.call(&agent, &transcript, &state.context).await {
            CallResult::Ok(invocation) => invocation,
            CallResult::Fallback(fallback) => {
                let mut trace = TurnTrace::default();
                trace.push_message(&agent.name, fallback.message.clone());

                state.transcript = fallback.transcript;
                state.transcript.push(TranscriptEntry::assistant(fallback.message));
                let response = self.response(&state, trace);
                self.persist(state).await?;
                return Ok(response);
            }
        };

        // PROCESS_ITEMS
        state.context.merge(&primary.context);
        let mut trace = self.stream.build(&primary.items, &agent.name, &self.registry);
        let mut canonical = primary.transcript;

        let target = self.handoff_target(&agent, &primary.items);

        // MAYBE_FOLLOWUP
        if let Some(target) = target {
            info!(
                conversation_id = %state.conversation_id,
                from = %agent.name,
                to = %target.name,
                "Handoff"
            );
            state.current_agent_name = target.name.clone();

            match self.caller.call(&target, &canonical, &state.context).await {
                CallResult::Ok(followup) => {
                    state.context.merge(&followup.context);
                    trace.extend(self.stream.build(&followup.items, &target.name, &self.registry));
                    if followup.has_handoff() {
                        debug!(
                            agent = %target.name,
                            "Follow-up handed off again; staying with the first target"
                        );
                    }
                    canonical = followup.transcript;
                }
                CallResult::Fallback(_) => {
                    error!(
                        conversation_id = %state.conversation_id,
                        agent = %target.name,
                        "Follow-up after handoff failed, keeping primary results"
                    );
                }
            }
        }

        // DIFF_CONTEXT
        let changes = ConversationContext::diff(&before, &state.context);
        if !changes.is_empty() {
            debug!(
                conversation_id = %state.conversation_id,
                fields = ?changes.keys().collect::<Vec<_>>(),
                "Context changed"
            );
            let mut metadata = Map::new();
            metadata.insert("changes".into(), Value::Object(changes));
            trace.push_event(
                Event::new(EventKind::ContextUpdate, state.current_agent_name.clone(), "")
                    .with_metadata(metadata),
            );
        }

        // PERSIST
        state.transcript = canonical;
        let response = self.response(&state, trace);
        self.persist(state).await?;
        Ok(response)
    }

    /// The registered agent a handoff item in `items` points at. An
    /// unregistered target keeps control with `agent`.
    fn handoff_target(&self, agent: &AgentDefinition, items: &[RunItem]) -> Option<Arc<AgentDefinition>> {
        let target_name = items.iter().rev().find_map(|item| match item {
            RunItem::Handoff { target_agent, .. } => Some(target_agent.as_str()),
            _ => None,
        })?;

        let target = self.registry.get(target_name);
        if target.is_none() {
            warn!(
                agent = %agent.name,
                target = %target_name,
                "Handoff to unregistered agent ignored"
            );
        }
        target
    }

    async fn persist(&self, state: ConversationState) -> Result<()> {
        let id = state.conversation_id.clone();
        debug!(
            conversation_id = %id,
            agent = %state.current_agent_name,
            transcript_len = state.transcript.len(),
            "Persisting conversation"
        );
        self.store.save(&id, state).await?;
        Ok(())
    }

    fn response(&self, state: &ConversationState, trace: TurnTrace) -> TurnResponse {
        TurnResponse {
            conversation_id: state.conversation_id.to_string(),
            current_agent: state.current_agent_name.clone(),
            messages: trace.messages,
            events: trace.events,
            context: state.context.clone(),
            agents: self.registry.roster(),
        }
    }

    fn turn_lock(&self, id: &ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .turn_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(id.clone()).or_default().clone()
    }

    /// Drop the per-id lock once no other turn is waiting on it. Called
    /// after the turn has persisted, while its guard is still held.
    fn release_turn_lock(&self, id: &ConversationId, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .turn_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // One reference in the map, one held by the finishing turn.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.turn_locks.lock().map(|l| l.len()).unwrap_or_default()
    }
}
