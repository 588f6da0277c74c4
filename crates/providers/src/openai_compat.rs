//! OpenAI-compatible agent runner.
//!
//! Runs one agent against any endpoint exposing `/chat/completions`
//! (OpenAI, OpenRouter, Ollama, vLLM, ...). The agent's tools are offered
//! as functions, and every declared handoff is offered as an extra
//! `transfer_to_<agent>` function. Tool calls are executed through the
//! shared [`ToolRegistry`]; the run ends when the model answers without
//! calling anything, at the first handoff, or after the iteration bound.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use waypoint_core::error::ProviderError;
use waypoint_core::{
    AgentDefinition, ConversationContext, Invocation, Provider, Role, RunItem, ToolCallRecord,
    ToolContract, ToolRegistry, TranscriptEntry,
};

/// Default bound on model round-trips per invocation.
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 8;

/// Function name offered to the model for handing off to `target`.
pub fn handoff_tool_name(target: &str) -> String {
    let slug: String = target
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("transfer_to_{slug}")
}

/// Runs a declared handoff callback, if one is registered as a tool.
pub(crate) async fn run_handoff_callback(
    tools: &ToolRegistry,
    agent: &AgentDefinition,
    target: &str,
    context: &mut ConversationContext,
) {
    let Some(callback) = agent
        .handoff_to(target)
        .and_then(|h| h.callback_id.as_deref())
    else {
        return;
    };

    if tools.get(callback).is_none() {
        debug!(callback = %callback, "Handoff callback not registered, skipping");
        return;
    }

    if let Err(e) = tools
        .execute(callback, serde_json::json!({}), context)
        .await
    {
        warn!(callback = %callback, error = %e, "Handoff callback failed");
    }
}

/// An OpenAI-compatible model runner.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    temperature: f32,
    max_tool_iterations: usize,
    tools: Arc<ToolRegistry>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible runner.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        tools: Arc<ToolRegistry>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            temperature: 0.7,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            tools,
            client,
        })
    }

    /// Create an OpenAI runner (convenience constructor).
    pub fn openai(
        api_key: impl Into<String>,
        tools: Arc<ToolRegistry>,
    ) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key, tools)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max.max(1);
        self
    }

    /// Convert transcript entries to OpenAI API format.
    fn to_api_messages(entries: &[TranscriptEntry]) -> Vec<ApiMessage> {
        entries
            .iter()
            .map(|e| ApiMessage {
                role: match e.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(e.content.clone()),
                tool_calls: if e.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        e.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: e.tool_call_id.clone(),
            })
            .collect()
    }

    /// The agent's tools plus one function per declared handoff.
    fn to_api_tools(agent: &AgentDefinition) -> Vec<ApiToolDefinition> {
        let tools = agent.tools.iter().map(|t: &ToolContract| ApiToolDefinition {
            r#type: "function".into(),
            function: ApiToolFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        });

        let handoffs = agent.handoffs.iter().map(|h| ApiToolDefinition {
            r#type: "function".into(),
            function: ApiToolFunction {
                name: handoff_tool_name(&h.target_agent),
                description: format!(
                    "Handoff to the {} to handle the request.",
                    h.target_agent
                ),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            },
        });

        tools.chain(handoffs).collect()
    }

    fn system_prompt(agent: &AgentDefinition, context: &ConversationContext) -> String {
        if context.is_empty() {
            agent.instructions.clone()
        } else {
            format!(
                "{}\n\nKnown conversation context: {}",
                agent.instructions,
                serde_json::Value::Object(context.as_map().clone())
            )
        }
    }

    async fn complete(
        &self,
        agent: &AgentDefinition,
        messages: &[ApiMessage],
    ) -> std::result::Result<ApiMessage, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": agent.model_id,
            "messages": messages,
            "temperature": self.temperature,
        });

        let tools = Self::to_api_tools(agent);
        if !tools.is_empty() {
            body["tools"] = serde_json::json!(tools);
        }

        debug!(provider = %self.name, agent = %agent.name, model = %agent.model_id, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        agent: &AgentDefinition,
        transcript: &[TranscriptEntry],
        context: &ConversationContext,
    ) -> std::result::Result<Invocation, ProviderError> {
        let handoff_targets: HashMap<String, String> = agent
            .handoffs
            .iter()
            .map(|h| (handoff_tool_name(&h.target_agent), h.target_agent.clone()))
            .collect();

        let mut context = context.clone();
        let mut canonical = transcript.to_vec();
        let mut items = Vec::new();
        let mut final_output = String::new();
        let mut handed_off = false;

        for iteration in 0..self.max_tool_iterations {
            let mut messages = vec![ApiMessage::system(Self::system_prompt(agent, &context))];
            messages.extend(Self::to_api_messages(&canonical));

            let reply = self.complete(agent, &messages).await?;
            let content = reply.content.unwrap_or_default();
            let tool_calls: Vec<ToolCallRecord> = reply
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|tc| ToolCallRecord {
                    id: tc.id,
                    name: tc.function.name,
                    arguments: tc.function.arguments,
                })
                .collect();

            let mut entry = TranscriptEntry::assistant(content.clone());
            entry.tool_calls = tool_calls.clone();
            canonical.push(entry);

            if !content.is_empty() {
                items.push(RunItem::message(content.clone()));
                final_output = content;
            }

            if tool_calls.is_empty() {
                return Ok(Invocation {
                    final_output,
                    items,
                    transcript: canonical,
                    context,
                });
            }

            for call in tool_calls {
                if handed_off {
                    canonical.push(TranscriptEntry::tool_result(
                        &call.id,
                        "Skipped: control was handed off.",
                    ));
                    continue;
                }

                if let Some(target) = handoff_targets.get(&call.name) {
                    debug!(agent = %agent.name, target = %target, "Model requested handoff");
                    run_handoff_callback(&self.tools, agent, target, &mut context).await;
                    items.push(RunItem::handoff(&agent.name, target));
                    canonical.push(TranscriptEntry::tool_result(
                        &call.id,
                        serde_json::json!({ "assistant": target }).to_string(),
                    ));
                    handed_off = true;
                    continue;
                }

                items.push(RunItem::ToolCall {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });

                let output = self.execute_tool(agent, &call, &mut context).await;
                let text = match &output {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                items.push(RunItem::ToolOutput {
                    call_id: call.id.clone(),
                    output,
                });
                canonical.push(TranscriptEntry::tool_result(&call.id, text));
            }

            if handed_off {
                break;
            }

            debug!(agent = %agent.name, iteration, "Tool round complete");
        }

        if !handed_off {
            warn!(
                agent = %agent.name,
                max = self.max_tool_iterations,
                "Tool iteration bound reached"
            );
        }

        Ok(Invocation {
            final_output,
            items,
            transcript: canonical,
            context,
        })
    }
}

impl OpenAiCompatProvider {
    /// Run one requested tool; failures become an `{"error": ...}` result
    /// the model can read, never an invocation error.
    async fn execute_tool(
        &self,
        agent: &AgentDefinition,
        call: &ToolCallRecord,
        context: &mut ConversationContext,
    ) -> serde_json::Value {
        if !agent.tools.iter().any(|t| t.name == call.name) {
            warn!(agent = %agent.name, tool = %call.name, "Model called an undeclared tool");
            return serde_json::json!({ "error": format!("Unknown tool: {}", call.name) });
        }

        let arguments = if call.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(&call.arguments) {
                Ok(v) => v,
                Err(e) => {
                    return serde_json::json!({ "error": format!("Invalid arguments: {e}") });
                }
            }
        };

        match self.tools.execute(&call.name, arguments, context).await {
            Ok(result) => result.to_value(),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                serde_json::json!({ "error": e.to_string() })
            }
        }
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn system(content: String) -> Self {
        Self {
            role: "system".into(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use waypoint_core::error::ToolError;
    use waypoint_core::{HandoffDefinition, Tool, ToolResult};

    struct MockApi {
        replies: Mutex<VecDeque<(u16, Value)>>,
        requests: Mutex<Vec<Value>>,
    }

    async fn completions(
        State(api): State<Arc<MockApi>>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        api.requests.lock().unwrap().push(body);
        let (status, reply) = api
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((200, text_reply("done")));
        (StatusCode::from_u16(status).unwrap(), Json(reply))
    }

    async fn mock_server(replies: Vec<(u16, Value)>) -> (String, Arc<MockApi>) {
        let api = Arc::new(MockApi {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/chat/completions", post(completions))
            .with_state(api.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), api)
    }

    fn text_reply(text: &str) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
    }

    fn tool_reply(id: &str, name: &str, arguments: &str) -> Value {
        json!({"choices": [{"message": {
            "role": "assistant",
            "content": null,
            "tool_calls": [{"id": id, "type": "function",
                "function": {"name": name, "arguments": arguments}}]
        }}]})
    }

    /// Stores the `reference` argument in the context.
    struct RecordBookingTool;

    #[async_trait]
    impl Tool for RecordBookingTool {
        fn name(&self) -> &str {
            "record_booking"
        }
        fn description(&self) -> &str {
            "Remember a booking reference"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"reference": {"type": "string"}}})
        }
        async fn execute(
            &self,
            arguments: Value,
            context: &mut ConversationContext,
        ) -> std::result::Result<ToolResult, ToolError> {
            let reference = arguments["reference"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("reference".into()))?;
            context.set("booking_reference", reference);
            Ok(ToolResult::text(format!("Recorded {reference}")))
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(RecordBookingTool));
        Arc::new(tools)
    }

    fn agent(tools: &ToolRegistry) -> AgentDefinition {
        AgentDefinition::new("Triage Agent", "gpt-3.5-turbo")
            .with_instructions("Help the customer.")
            .with_tool(tools.contract("record_booking").unwrap())
            .with_handoff(HandoffDefinition::to("FAQ Agent"))
    }

    #[test]
    fn handoff_tool_names_are_slugs() {
        assert_eq!(handoff_tool_name("FAQ Agent"), "transfer_to_faq_agent");
        assert_eq!(
            handoff_tool_name("Trip Management Agent"),
            "transfer_to_trip_management_agent"
        );
    }

    #[test]
    fn transcript_conversion() {
        let mut assistant = TranscriptEntry::assistant("");
        assistant.tool_calls = vec![ToolCallRecord {
            id: "call_1".into(),
            name: "record_booking".into(),
            arguments: r#"{"reference":"BK1"}"#.into(),
        }];
        let entries = vec![
            TranscriptEntry::user("hello"),
            assistant,
            TranscriptEntry::tool_result("call_1", "Recorded BK1"),
        ];
        let api = OpenAiCompatProvider::to_api_messages(&entries);
        assert_eq!(api[0].role, "user");
        assert_eq!(api[1].tool_calls.as_ref().unwrap()[0].function.name, "record_booking");
        assert_eq!(api[2].role, "tool");
        assert_eq!(api[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tools_include_handoff_functions() {
        let tools = registry();
        let api_tools = OpenAiCompatProvider::to_api_tools(&agent(&tools));
        let names: Vec<&str> = api_tools.iter().map(|t| t.function.name.as_str()).collect();
        assert_eq!(names, vec!["record_booking", "transfer_to_faq_agent"]);
        assert!(api_tools.iter().all(|t| t.r#type == "function"));
    }

    #[tokio::test]
    async fn tool_round_then_answer() {
        let (url, api) = mock_server(vec![
            (200, tool_reply("call_1", "record_booking", r#"{"reference":"BK-42"}"#)),
            (200, text_reply("Your booking is noted.")),
        ])
        .await;
        let tools = registry();
        let provider = OpenAiCompatProvider::new("test", url, "sk-test", tools.clone()).unwrap();
        let agent = agent(&tools);

        let inv = provider
            .invoke(
                &agent,
                &[TranscriptEntry::user("My booking is BK-42")],
                &ConversationContext::new(),
            )
            .await
            .unwrap();

        let kinds: Vec<&str> = inv.items.iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec!["tool_call", "tool_output", "message"]);
        assert_eq!(inv.final_output, "Your booking is noted.");
        assert_eq!(inv.context.get_str("booking_reference"), Some("BK-42"));

        let roles: Vec<Role> = inv.transcript.iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );

        let requests = api.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["model"], "gpt-3.5-turbo");
        assert_eq!(requests[0]["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn stops_at_first_handoff() {
        let (url, api) = mock_server(vec![(
            200,
            tool_reply("call_h", "transfer_to_faq_agent", "{}"),
        )])
        .await;
        let tools = registry();
        let provider = OpenAiCompatProvider::new("test", url, "sk-test", tools.clone()).unwrap();

        let inv = provider
            .invoke(
                &agent(&tools),
                &[TranscriptEntry::user("What is the baggage policy?")],
                &ConversationContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(inv.items, vec![RunItem::handoff("Triage Agent", "FAQ Agent")]);
        assert!(inv.has_handoff());
        assert_eq!(api.requests.lock().unwrap().len(), 1);
        assert_eq!(inv.transcript.last().unwrap().role, Role::Tool);
    }

    #[tokio::test]
    async fn bad_arguments_become_error_output() {
        let (url, _api) = mock_server(vec![
            (200, tool_reply("call_1", "record_booking", "{not json")),
            (200, text_reply("Sorry.")),
        ])
        .await;
        let tools = registry();
        let provider = OpenAiCompatProvider::new("test", url, "sk-test", tools.clone()).unwrap();

        let inv = provider
            .invoke(
                &agent(&tools),
                &[TranscriptEntry::user("hi")],
                &ConversationContext::new(),
            )
            .await
            .unwrap();

        match &inv.items[1] {
            RunItem::ToolOutput { output, .. } => {
                assert!(output["error"].as_str().unwrap().contains("Invalid arguments"));
            }
            other => panic!("Expected tool output, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn iteration_bound_is_respected() {
        let replies = (0..5)
            .map(|i| {
                (
                    200,
                    tool_reply(&format!("call_{i}"), "record_booking", r#"{"reference":"X"}"#),
                )
            })
            .collect();
        let (url, api) = mock_server(replies).await;
        let tools = registry();
        let provider = OpenAiCompatProvider::new("test", url, "sk-test", tools.clone())
            .unwrap()
            .with_max_tool_iterations(2);

        let inv = provider
            .invoke(
                &agent(&tools),
                &[TranscriptEntry::user("loop")],
                &ConversationContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(api.requests.lock().unwrap().len(), 2);
        assert_eq!(inv.items.len(), 4);
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let (url, _api) = mock_server(vec![
            (401, json!({"error": "bad key"})),
            (429, json!({"error": "slow down"})),
            (500, json!({"error": "boom"})),
        ])
        .await;
        let tools = registry();
        let provider = OpenAiCompatProvider::new("test", url, "sk-test", tools.clone()).unwrap();
        let agent = agent(&tools);
        let transcript = [TranscriptEntry::user("hi")];
        let ctx = ConversationContext::new();

        assert!(matches!(
            provider.invoke(&agent, &transcript, &ctx).await,
            Err(ProviderError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            provider.invoke(&agent, &transcript, &ctx).await,
            Err(ProviderError::RateLimited { .. })
        ));
        assert!(matches!(
            provider.invoke(&agent, &transcript, &ctx).await,
            Err(ProviderError::ApiError {
                status_code: 500,
                ..
            })
        ));
    }
}
