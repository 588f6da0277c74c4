//! `waypoint chat`: interactive or single-message chat mode.

use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use waypoint_agent::{TurnRequest, TurnResponse, UI_SENTINEL};
use waypoint_config::AppConfig;
use waypoint_core::EventKind;
use waypoint_gateway::bootstrap::build_orchestrator;

pub async fn run(message: Option<String>, offline: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let orchestrator = build_orchestrator(&config, offline).await?;

    if let Some(msg) = message {
        // Single message mode
        let response = orchestrator.handle_turn(TurnRequest::new(None, msg)).await?;
        for line in render_turn(&response) {
            println!("{line}");
        }
        return Ok(());
    }

    // Interactive mode
    let start = orchestrator.handle_turn(TurnRequest::new(None, "")).await?;
    let mut conversation_id = start.conversation_id;

    println!();
    println!("  Waypoint: airline customer service");
    println!();
    println!("  Provider:      {}", orchestrator.caller().provider_name());
    println!("  Model:         {}", config.active_model());
    println!("  Conversation:  {conversation_id}");
    println!("  Agent:         {}", start.current_agent);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    print!("  You > ");
    std::io::stdout().flush()?;

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }

        match orchestrator
            .handle_turn(TurnRequest::new(Some(conversation_id.as_str()), text))
            .await
        {
            Ok(response) => {
                conversation_id = response.conversation_id.clone();
                println!();
                for rendered in render_turn(&response) {
                    println!("{rendered}");
                }
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

/// Terminal lines for one turn: handoffs and tool calls as trace lines,
/// then the agents' messages.
pub fn render_turn(response: &TurnResponse) -> Vec<String> {
    let mut lines = Vec::new();

    for event in &response.events {
        match event.kind {
            EventKind::Handoff => lines.push(format!("  ~ handoff {}", event.content)),
            EventKind::ToolCall => {
                let args = event
                    .meta("tool_args")
                    .map(|a| format!(" {a}"))
                    .unwrap_or_default();
                lines.push(format!("  ~ {} calls {}{args}", event.agent, event.content));
            }
            EventKind::ContextUpdate => {
                if let Some(changes) = event.meta("changes") {
                    lines.push(format!("  ~ context {changes}"));
                }
            }
            EventKind::Message | EventKind::ToolOutput => {}
        }
    }

    for message in &response.messages {
        if message.content == UI_SENTINEL {
            lines.push(format!("  {} > [seat map]", message.agent));
        } else {
            for text in message.content.lines() {
                lines.push(format!("  {} > {text}", message.agent));
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waypoint_core::{ConversationContext, Event, TurnMessage};

    fn response(messages: Vec<TurnMessage>, events: Vec<Event>) -> TurnResponse {
        TurnResponse {
            conversation_id: "c1".into(),
            current_agent: "FAQ Agent".into(),
            messages,
            events,
            context: ConversationContext::new(),
            agents: vec![],
        }
    }

    #[test]
    fn renders_messages_per_line() {
        let lines = render_turn(&response(
            vec![TurnMessage::new("one\ntwo", "FAQ Agent")],
            vec![],
        ));
        assert_eq!(lines, vec!["  FAQ Agent > one", "  FAQ Agent > two"]);
    }

    #[test]
    fn renders_handoffs_and_tool_calls_before_messages() {
        let mut args = serde_json::Map::new();
        args.insert("tool_args".into(), json!({"question": "wifi?"}));
        let lines = render_turn(&response(
            vec![
                TurnMessage::new(UI_SENTINEL, "Trip Management Agent"),
                TurnMessage::new("Pick a seat", "Trip Management Agent"),
            ],
            vec![
                Event::new(EventKind::Handoff, "Triage Agent", "Triage Agent -> FAQ Agent"),
                Event::new(EventKind::ToolCall, "FAQ Agent", "faq_lookup_tool").with_metadata(args),
                Event::new(EventKind::Message, "FAQ Agent", "ignored"),
            ],
        ));
        assert_eq!(
            lines,
            vec![
                "  ~ handoff Triage Agent -> FAQ Agent",
                r#"  ~ FAQ Agent calls faq_lookup_tool {"question":"wifi?"}"#,
                "  Trip Management Agent > [seat map]",
                "  Trip Management Agent > Pick a seat",
            ]
        );
    }
}
