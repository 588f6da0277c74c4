//! Turn trace assembly.
//!
//! `EventStreamBuilder` turns the ordered run items of one model
//! invocation into the client-facing `(messages, events)` pair. It is a
//! pure classification step: no I/O, no mutation of conversation state.
//!
//! Per item:
//! - `message`     → one message entry and one `message` event
//! - `tool_call`   → one `tool_call` event, plus a UI sentinel message when
//!   the tool is the configured UI trigger
//! - `tool_output` → one `tool_output` event
//! - `handoff`     → one `handoff` event, plus a synthetic `tool_call` event
//!   for a declared handoff callback

use serde_json::{Map, Value, json};
use waypoint_core::{AgentRegistry, Event, EventKind, RunItem, TurnMessage};

/// Marker message telling the client to render the seat map.
pub const UI_SENTINEL: &str = "DISPLAY_SEAT_MAP";

/// Messages and events accumulated over one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnTrace {
    pub messages: Vec<TurnMessage>,
    pub events: Vec<Event>,
}

impl TurnTrace {
    pub fn push_message(&mut self, agent: &str, content: impl Into<String>) {
        let content = content.into();
        self.messages.push(TurnMessage::new(content.clone(), agent));
        self.events.push(Event::new(EventKind::Message, agent, content));
    }

    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Append another trace after this one.
    pub fn extend(&mut self, other: TurnTrace) {
        self.messages.extend(other.messages);
        self.events.extend(other.events);
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

#[derive(Debug, Clone)]
pub struct EventStreamBuilder {
    ui_trigger_tool: String,
}

impl EventStreamBuilder {
    pub fn new(ui_trigger_tool: impl Into<String>) -> Self {
        Self {
            ui_trigger_tool: ui_trigger_tool.into(),
        }
    }

    pub fn ui_trigger_tool(&self) -> &str {
        &self.ui_trigger_tool
    }

    /// Classify `items` produced by `acting_agent`.
    ///
    /// Handoff events are attributed to the handing-off agent; callback
    /// events to the agent receiving control. Everything else belongs to
    /// `acting_agent`.
    pub fn build(&self, items: &[RunItem], acting_agent: &str, registry: &AgentRegistry) -> TurnTrace {
        let mut trace = TurnTrace::default();

        for item in items {
            match item {
                RunItem::Message { content } => {
                    trace.push_message(acting_agent, content.clone());
                }
                RunItem::ToolCall { name, arguments, .. } => {
                    let mut metadata = Map::new();
                    metadata.insert("tool_args".into(), parse_arguments(arguments));
                    trace.push_event(
                        Event::new(EventKind::ToolCall, acting_agent, name.clone())
                            .with_metadata(metadata),
                    );

                    if *name == self.ui_trigger_tool {
                        trace
                            .messages
                            .push(TurnMessage::new(UI_SENTINEL, acting_agent));
                    }
                }
                RunItem::ToolOutput { output, .. } => {
                    let mut metadata = Map::new();
                    metadata.insert("tool_result".into(), output.clone());
                    trace.push_event(
                        Event::new(EventKind::ToolOutput, acting_agent, stringify(output))
                            .with_metadata(metadata),
                    );
                }
                RunItem::Handoff {
                    source_agent,
                    target_agent,
                } => {
                    let metadata = json!({
                        "source_agent": source_agent,
                        "target_agent": target_agent,
                    });
                    let event = Event::new(
                        EventKind::Handoff,
                        source_agent.clone(),
                        format!("{source_agent} -> {target_agent}"),
                    );
                    trace.push_event(match metadata {
                        Value::Object(map) => event.with_metadata(map),
                        _ => event,
                    });

                    if let Some(callback) = registry.handoff_callback(source_agent, target_agent) {
                        trace.push_event(Event::new(
                            EventKind::ToolCall,
                            target_agent.clone(),
                            callback,
                        ));
                    }
                }
            }
        }

        trace
    }
}

/// Structured arguments when the payload is valid JSON, else the raw text.
fn parse_arguments(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn stringify(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{AgentDefinition, HandoffDefinition};

    fn registry() -> AgentRegistry {
        AgentRegistry::new(
            "Triage Agent",
            vec![
                AgentDefinition::new("Triage Agent", "m")
                    .with_handoff(HandoffDefinition::to("FAQ Agent"))
                    .with_handoff(
                        HandoffDefinition::to("Trip Management Agent")
                            .with_callback("on_trip_handoff"),
                    ),
                AgentDefinition::new("FAQ Agent", "m"),
                AgentDefinition::new("Trip Management Agent", "m"),
            ],
        )
        .unwrap()
    }

    fn builder() -> EventStreamBuilder {
        EventStreamBuilder::new("display_seat_map")
    }

    #[test]
    fn message_item_yields_one_message_and_one_event() {
        let trace = builder().build(&[RunItem::message("Hi")], "FAQ Agent", &registry());
        assert_eq!(trace.messages, vec![TurnMessage::new("Hi", "FAQ Agent")]);
        assert_eq!(trace.events.len(), 1);
        assert_eq!(trace.events[0].kind, EventKind::Message);
        assert_eq!(trace.events[0].content, "Hi");
        assert_eq!(trace.events[0].agent, "FAQ Agent");
    }

    #[test]
    fn tool_call_arguments_are_parsed() {
        let items = [RunItem::ToolCall {
            call_id: "call_1".into(),
            name: "lookup_trip_data".into(),
            arguments: r#"{"query":"BK-00000001"}"#.into(),
        }];
        let trace = builder().build(&items, "Triage Agent", &registry());
        assert!(trace.messages.is_empty());
        let event = &trace.events[0];
        assert_eq!(event.kind, EventKind::ToolCall);
        assert_eq!(event.content, "lookup_trip_data");
        assert_eq!(event.meta("tool_args"), Some(&json!({"query": "BK-00000001"})));
    }

    #[test]
    fn malformed_arguments_fall_back_to_raw_text() {
        let items = [RunItem::ToolCall {
            call_id: "call_1".into(),
            name: "search_trips".into(),
            arguments: "{not json".into(),
        }];
        let trace = builder().build(&items, "Triage Agent", &registry());
        assert_eq!(trace.events[0].meta("tool_args"), Some(&json!("{not json")));
    }

    #[test]
    fn ui_trigger_tool_adds_sentinel_message() {
        let items = [RunItem::ToolCall {
            call_id: "call_1".into(),
            name: "display_seat_map".into(),
            arguments: "{}".into(),
        }];
        let trace = builder().build(&items, "Trip Management Agent", &registry());
        assert_eq!(
            trace.messages,
            vec![TurnMessage::new(UI_SENTINEL, "Trip Management Agent")]
        );
        assert_eq!(trace.events.len(), 1);
        assert_eq!(trace.count(EventKind::Message), 0);
    }

    #[test]
    fn tool_output_is_stringified_with_raw_metadata() {
        let items = [
            RunItem::ToolOutput {
                call_id: "call_1".into(),
                output: json!("12:00:00"),
            },
            RunItem::ToolOutput {
                call_id: "call_2".into(),
                output: json!({"total_trips": 3}),
            },
        ];
        let trace = builder().build(&items, "FAQ Agent", &registry());
        assert_eq!(trace.events[0].content, "12:00:00");
        assert_eq!(trace.events[1].content, r#"{"total_trips":3}"#);
        assert_eq!(
            trace.events[1].meta("tool_result"),
            Some(&json!({"total_trips": 3}))
        );
    }

    #[test]
    fn handoff_event_is_attributed_to_source() {
        let items = [RunItem::handoff("Triage Agent", "FAQ Agent")];
        let trace = builder().build(&items, "Triage Agent", &registry());
        assert_eq!(trace.events.len(), 1);
        let event = &trace.events[0];
        assert_eq!(event.kind, EventKind::Handoff);
        assert_eq!(event.agent, "Triage Agent");
        assert_eq!(event.content, "Triage Agent -> FAQ Agent");
        assert_eq!(event.meta("source_agent"), Some(&json!("Triage Agent")));
        assert_eq!(event.meta("target_agent"), Some(&json!("FAQ Agent")));
    }

    #[test]
    fn handoff_callback_adds_synthetic_tool_call() {
        let items = [RunItem::handoff("Triage Agent", "Trip Management Agent")];
        let trace = builder().build(&items, "Triage Agent", &registry());
        assert_eq!(trace.events.len(), 2);
        let synthetic = &trace.events[1];
        assert_eq!(synthetic.kind, EventKind::ToolCall);
        assert_eq!(synthetic.agent, "Trip Management Agent");
        assert_eq!(synthetic.content, "on_trip_handoff");
        assert!(synthetic.metadata.is_none());
    }

    #[test]
    fn every_item_yields_an_event() {
        let items = [
            RunItem::ToolCall {
                call_id: "call_1".into(),
                name: "faq_lookup_tool".into(),
                arguments: r#"{"question":"wifi?"}"#.into(),
            },
            RunItem::ToolOutput {
                call_id: "call_1".into(),
                output: json!("We have free wifi"),
            },
            RunItem::message("We have free wifi"),
        ];
        let trace = builder().build(&items, "FAQ Agent", &registry());
        assert_eq!(trace.events.len(), 3);
        assert_eq!(trace.messages.len(), 1);
    }
}
