//! Agent definitions and the static agent registry.
//!
//! Agents, their tools, and their handoffs are closed, explicitly declared
//! structs registered at startup. Nothing is discovered by inspecting
//! values at runtime: a handoff's side-effect callback, for instance, is a
//! declared `callback_id` rather than something recovered from a closure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::RegistryError;

/// The declared contract of a tool an agent may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolContract {
    /// The unique tool name (matches the `Tool::name` that executes it)
    pub name: String,

    /// Description sent to the model
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A declared transition of control to another agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffDefinition {
    /// Name of the agent that takes over
    pub target_agent: String,

    /// Identifier of a side-effect callback run when the handoff fires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
}

impl HandoffDefinition {
    pub fn to(target_agent: impl Into<String>) -> Self {
        Self {
            target_agent: target_agent.into(),
            callback_id: None,
        }
    }

    pub fn with_callback(mut self, callback_id: impl Into<String>) -> Self {
        self.callback_id = Some(callback_id.into());
        self
    }
}

/// Everything the orchestrator needs to know about one agent.
/// Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique key
    pub name: String,

    /// Short description shown in the agent roster
    #[serde(default)]
    pub description: String,

    /// System instructions given to the model
    pub instructions: String,

    /// Model identifier used when invoking this agent
    pub model_id: String,

    #[serde(default)]
    pub tools: Vec<ToolContract>,

    #[serde(default)]
    pub handoffs: Vec<HandoffDefinition>,
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: String::new(),
            model_id: model_id.into(),
            tools: Vec::new(),
            handoffs: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_tool(mut self, tool: ToolContract) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_handoff(mut self, handoff: HandoffDefinition) -> Self {
        self.handoffs.push(handoff);
        self
    }

    /// The declared handoff to `target`, if this agent has one.
    pub fn handoff_to(&self, target: &str) -> Option<&HandoffDefinition> {
        self.handoffs.iter().find(|h| h.target_agent == target)
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            handoffs: self.handoffs.iter().map(|h| h.target_agent.clone()).collect(),
            tools: self.tools.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// Roster entry returned with every turn response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
    pub handoffs: Vec<String>,
    pub tools: Vec<String>,
}

/// Static map of agent name to definition, plus the default entry agent.
///
/// Registration order is preserved for the roster.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<Arc<AgentDefinition>>,
    index: HashMap<String, usize>,
    default_agent: Arc<AgentDefinition>,
}

impl AgentRegistry {
    /// Build a registry. Fails on duplicate names or an unregistered default.
    pub fn new(
        default_agent: &str,
        definitions: Vec<AgentDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut agents = Vec::with_capacity(definitions.len());
        let mut index = HashMap::new();

        for def in definitions {
            if index.contains_key(&def.name) {
                return Err(RegistryError::DuplicateAgent(def.name));
            }
            index.insert(def.name.clone(), agents.len());
            agents.push(Arc::new(def));
        }

        let default_agent = index
            .get(default_agent)
            .map(|&i| agents[i].clone())
            .ok_or_else(|| RegistryError::UnknownDefaultAgent(default_agent.to_string()))?;

        Ok(Self {
            agents,
            index,
            default_agent,
        })
    }

    /// Check that every declared handoff points at a registered agent.
    pub fn validate_handoffs(&self) -> Result<(), RegistryError> {
        for agent in &self.agents {
            for handoff in &agent.handoffs {
                if !self.contains(&handoff.target_agent) {
                    return Err(RegistryError::UnknownHandoffTarget {
                        source_agent: agent.name.clone(),
                        target: handoff.target_agent.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<AgentDefinition>> {
        self.index.get(name).map(|&i| self.agents[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn default_agent(&self) -> Arc<AgentDefinition> {
        self.default_agent.clone()
    }

    /// Look up `name`, falling back to the default agent when it is unknown.
    pub fn resolve(&self, name: &str) -> Arc<AgentDefinition> {
        match self.get(name) {
            Some(agent) => agent,
            None => {
                warn!(
                    requested = %name,
                    fallback = %self.default_agent.name,
                    "Unknown agent, falling back to default"
                );
                self.default_agent()
            }
        }
    }

    /// The callback declared on `source`'s handoff to `target`, if any.
    pub fn handoff_callback(&self, source: &str, target: &str) -> Option<String> {
        self.get(source)
            .and_then(|agent| agent.handoff_to(target).and_then(|h| h.callback_id.clone()))
    }

    /// Roster metadata for every agent, in registration order.
    pub fn roster(&self) -> Vec<AgentSummary> {
        self.agents.iter().map(|a| a.summary()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
