//! Deterministic, offline model runner.
//!
//! `ScriptedProvider` answers from keyword rules instead of a model. It
//! backs `waypoint chat --offline` and the end-to-end tests: rules pick a
//! script by agent name and the latest user message, and the script's
//! steps are played back as run items. Tool steps really execute through
//! the [`ToolRegistry`], so context updates behave as they would live.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;
use waypoint_core::error::ProviderError;
use waypoint_core::{
    AgentDefinition, ConversationContext, Invocation, Provider, Role, RunItem, ToolCallRecord,
    ToolRegistry, TranscriptEntry,
};

use crate::openai_compat::{handoff_tool_name, run_handoff_callback};

/// One scripted action.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Reply with text
    Say(String),
    /// Call a registered tool with these arguments
    CallTool { name: String, arguments: Value },
    /// Call a registered tool, passing the latest user message as `field`
    AskTool { name: String, field: String },
    /// Reply with the text of the most recent tool output
    RelayToolOutput,
    /// Hand control to another agent; ends the run
    Handoff(String),
    /// Fail the whole invocation
    Fail(String),
}

impl ScriptStep {
    pub fn say(text: impl Into<String>) -> Self {
        Self::Say(text.into())
    }

    pub fn tool(name: impl Into<String>, arguments: Value) -> Self {
        Self::CallTool {
            name: name.into(),
            arguments,
        }
    }

    pub fn ask(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::AskTool {
            name: name.into(),
            field: field.into(),
        }
    }

    pub fn handoff(target: impl Into<String>) -> Self {
        Self::Handoff(target.into())
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail(reason.into())
    }
}

#[derive(Debug, Clone)]
struct ScriptRule {
    agent: String,
    keywords: Vec<String>,
    steps: Vec<ScriptStep>,
}

impl ScriptRule {
    fn matches(&self, agent: &str, message: &str) -> bool {
        self.agent == agent
            && (self.keywords.is_empty() || self.keywords.iter().any(|k| message.contains(k)))
    }
}

pub struct ScriptedProvider {
    rules: Vec<ScriptRule>,
    tools: Arc<ToolRegistry>,
    default_reply: String,
    invocations: Mutex<Vec<String>>,
    next_call_id: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            rules: Vec::new(),
            tools,
            default_reply: "I'm not sure how to help with that.".into(),
            invocations: Mutex::new(Vec::new()),
            next_call_id: AtomicUsize::new(1),
        }
    }

    /// Add a rule. The first rule whose agent matches and whose keywords
    /// (case-insensitive, any of) occur in the latest user message wins.
    /// An empty keyword list matches every message for that agent.
    pub fn rule(mut self, agent: impl Into<String>, keywords: &[&str], steps: Vec<ScriptStep>) -> Self {
        self.rules.push(ScriptRule {
            agent: agent.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            steps,
        });
        self
    }

    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    /// Agent names this provider was invoked for, in order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.invocations().len()
    }

    fn next_call_id(&self) -> String {
        format!("call_{}", self.next_call_id.fetch_add(1, Ordering::Relaxed))
    }

    fn script_for(&self, agent: &str, message: &str) -> Vec<ScriptStep> {
        let message = message.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.matches(agent, &message))
            .map(|r| r.steps.clone())
            .unwrap_or_else(|| vec![ScriptStep::Say(self.default_reply.clone())])
    }

    fn push_tool_call(&self, canonical: &mut Vec<TranscriptEntry>, name: &str, arguments: &str) -> String {
        let call_id = self.next_call_id();
        let mut entry = TranscriptEntry::assistant("");
        entry.tool_calls.push(ToolCallRecord {
            id: call_id.clone(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        });
        canonical.push(entry);
        call_id
    }

    /// Execute one tool step, recording call, output, and transcript
    /// entries. Returns the output text.
    async fn play_tool(
        &self,
        name: &str,
        arguments: Value,
        canonical: &mut Vec<TranscriptEntry>,
        items: &mut Vec<RunItem>,
        context: &mut ConversationContext,
    ) -> String {
        let raw = arguments.to_string();
        let call_id = self.push_tool_call(canonical, name, &raw);
        items.push(RunItem::ToolCall {
            call_id: call_id.clone(),
            name: name.to_string(),
            arguments: raw,
        });

        let output = match self.tools.execute(name, arguments, context).await {
            Ok(result) => result.to_value(),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        let text = match &output {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        canonical.push(TranscriptEntry::tool_result(&call_id, text.clone()));
        items.push(RunItem::ToolOutput { call_id, output });
        text
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(
        &self,
        agent: &AgentDefinition,
        transcript: &[TranscriptEntry],
        context: &ConversationContext,
    ) -> std::result::Result<Invocation, ProviderError> {
        if let Ok(mut calls) = self.invocations.lock() {
            calls.push(agent.name.clone());
        }

        let user_message = transcript
            .iter()
            .rev()
            .find(|e| e.role == Role::User)
            .map(|e| e.content.clone())
            .unwrap_or_default();
        let steps = self.script_for(&agent.name, &user_message);
        debug!(agent = %agent.name, steps = steps.len(), "Playing script");

        let mut context = context.clone();
        let mut canonical = transcript.to_vec();
        let mut items = Vec::new();
        let mut final_output = String::new();
        let mut last_tool_text = String::new();

        for step in steps {
            match step {
                ScriptStep::Say(text) => {
                    canonical.push(TranscriptEntry::assistant(text.clone()));
                    items.push(RunItem::message(text.clone()));
                    final_output = text;
                }
                ScriptStep::CallTool { name, arguments } => {
                    last_tool_text = self
                        .play_tool(&name, arguments, &mut canonical, &mut items, &mut context)
                        .await;
                }
                ScriptStep::AskTool { name, field } => {
                    let mut arguments = serde_json::Map::new();
                    arguments.insert(field, Value::String(user_message.clone()));
                    let arguments = Value::Object(arguments);
                    last_tool_text = self
                        .play_tool(&name, arguments, &mut canonical, &mut items, &mut context)
                        .await;
                }
                ScriptStep::RelayToolOutput => {
                    canonical.push(TranscriptEntry::assistant(last_tool_text.clone()));
                    items.push(RunItem::message(last_tool_text.clone()));
                    final_output = last_tool_text.clone();
                }
                ScriptStep::Handoff(target) => {
                    let call_id =
                        self.push_tool_call(&mut canonical, &handoff_tool_name(&target), "{}");
                    run_handoff_callback(&self.tools, agent, &target, &mut context).await;
                    canonical.push(TranscriptEntry::tool_result(
                        &call_id,
                        serde_json::json!({ "assistant": target }).to_string(),
                    ));
                    items.push(RunItem::handoff(&agent.name, target));
                    break;
                }
                ScriptStep::Fail(reason) => {
                    return Err(ProviderError::ApiError {
                        status_code: 503,
                        message: reason,
                    });
                }
            }
        }

        Ok(Invocation {
            final_output,
            items,
            transcript: canonical,
            context,
        })
    }
}
