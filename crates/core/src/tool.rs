//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are async callables with a declared name and JSON arguments and
//! results. The orchestrator only observes name/arguments/result for
//! tracing; providers use the registry to actually run them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::agent::ToolContract;
use crate::context::ConversationContext;
use crate::error::ToolError;

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
        }
    }

    /// The JSON value reported as the tool's result in traces.
    pub fn to_value(&self) -> serde_json::Value {
        self.data
            .clone()
            .unwrap_or_else(|| serde_json::Value::String(self.output.clone()))
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "faq_lookup_tool").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool. Tools may read and update the conversation context.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        context: &mut ConversationContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// The contract agents declare for this tool.
    fn contract(&self) -> ToolContract {
        ToolContract {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of executable tools, keyed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Contract for a registered tool, for declaring it on an agent.
    pub fn contract(&self, name: &str) -> Option<ToolContract> {
        self.get(name).map(|t| t.contract())
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
        context: &mut ConversationContext,
    ) -> std::result::Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(arguments, context).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes its input and remembers it in the context.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
            context: &mut ConversationContext,
        ) -> std::result::Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            context.set("last_echo", text.clone());
            Ok(ToolResult::text(text))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.contract("echo").unwrap().name, "echo");
    }

    #[tokio::test]
    async fn registry_execute_tool_updates_context() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let mut ctx = ConversationContext::new();
        let result = registry
            .execute("echo", serde_json::json!({"text": "hello world"}), &mut ctx)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello world");
        assert_eq!(ctx.get_str("last_echo"), Some("hello world"));
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let mut ctx = ConversationContext::new();
        let err = registry
            .execute("nonexistent", serde_json::json!({}), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn result_value_prefers_structured_data() {
        let plain = ToolResult::text("ok");
        assert_eq!(plain.to_value(), serde_json::json!("ok"));
        let structured = ToolResult {
            success: true,
            output: "1 trip".into(),
            data: Some(serde_json::json!({"count": 1})),
        };
        assert_eq!(structured.to_value()["count"], 1);
    }
}
