//! The airline customer-service roster.
//!
//! Three agents: a triage entry point that routes to FAQ and trip
//! management specialists, each of which can hand control back.

use rand::Rng;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;
use waypoint_config::AppConfig;
use waypoint_core::error::RegistryError;
use waypoint_core::{
    AgentDefinition, AgentRegistry, ConversationContext, ConversationStore, HandoffDefinition,
    Provider, ToolRegistry,
};
use waypoint_providers::{RetryingCachingCaller, ScriptStep, ScriptedProvider};

use crate::orchestrator::{ContextInitializer, Orchestrator};
use crate::stream::EventStreamBuilder;

pub const TRIAGE_AGENT: &str = "Triage Agent";
pub const FAQ_AGENT: &str = "FAQ Agent";
pub const TRIP_AGENT: &str = "Trip Management Agent";

const PROMPT_PREFIX: &str = "# System context\n\
You are part of a multi-agent system designed to make agent coordination and execution easy. \
Agents hand off a conversation to another agent by calling a transfer function, named \
`transfer_to_<agent_name>`. Transfers between agents are handled seamlessly in the background; \
do not mention or draw attention to these transfers in your conversation with the user.";

const TRIAGE_INSTRUCTIONS: &str = "You are a helpful triage agent. You can help customers with:
1. Trip data lookup and management
2. Frequently asked questions
3. General airline information
Use the available tools to provide helpful responses. Hand off to a specialist when the request needs one.
Keep responses concise and friendly.";

const FAQ_INSTRUCTIONS: &str = "You are an FAQ agent. Answer customer questions about airline services.
Use the faq_lookup_tool to get accurate information.
If the question is not about airline policies, transfer back to the triage agent.
Keep responses concise and helpful.";

const TRIP_INSTRUCTIONS: &str = "You are a Trip Management Agent. Help customers with:
1. Looking up trip information using booking reference or traveler name
2. Searching for trips by destination, type, or budget
3. Getting trip statistics and insights
4. Cancelling upcoming trips
5. Changing seats: call display_seat_map so the customer can pick a seat
Use the appropriate tools to help customers with their trip-related inquiries.";

/// Fields every airline conversation context carries.
pub const CONTEXT_FIELDS: [&str; 6] = [
    "passenger_name",
    "confirmation_number",
    "seat_number",
    "flight_number",
    "account_number",
    "booking_reference",
];

/// Fresh airline context: every field null except a random 8-digit
/// account number.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirlineContextInitializer;

impl ContextInitializer for AirlineContextInitializer {
    fn initial_context(&self) -> ConversationContext {
        let mut context = ConversationContext::new();
        for field in CONTEXT_FIELDS {
            context.set(field, Value::Null);
        }
        let account: u32 = rand::rng().random_range(10_000_000..100_000_000);
        context.set("account_number", account.to_string());
        context
    }
}

/// Build the airline roster for `model_id`, wiring each agent to the
/// contracts of the tools it may call. `default_agent` is the entry point
/// for new conversations.
pub fn airline_registry(
    model_id: &str,
    default_agent: &str,
    tools: &ToolRegistry,
) -> Result<AgentRegistry, RegistryError> {
    let triage = with_tools(
        AgentDefinition::new(TRIAGE_AGENT, model_id)
            .with_description("A triage agent that can help with various airline services.")
            .with_instructions(format!("{PROMPT_PREFIX}\n{TRIAGE_INSTRUCTIONS}"))
            .with_handoff(HandoffDefinition::to(FAQ_AGENT))
            .with_handoff(HandoffDefinition::to(TRIP_AGENT)),
        tools,
        &[
            "lookup_trip_data",
            "get_trip_statistics",
            "search_trips",
            "faq_lookup_tool",
        ],
    );

    let faq = with_tools(
        AgentDefinition::new(FAQ_AGENT, model_id)
            .with_description("A helpful agent that can answer questions about the airline.")
            .with_instructions(format!("{PROMPT_PREFIX}\n{FAQ_INSTRUCTIONS}"))
            .with_handoff(HandoffDefinition::to(TRIAGE_AGENT)),
        tools,
        &["faq_lookup_tool", "current_date_tool", "current_time_tool"],
    );

    let trips = with_tools(
        AgentDefinition::new(TRIP_AGENT, model_id)
            .with_description(
                "An agent that can help with trip data lookup and management like CRUD operations.",
            )
            .with_instructions(format!("{PROMPT_PREFIX}\n{TRIP_INSTRUCTIONS}"))
            .with_handoff(HandoffDefinition::to(TRIAGE_AGENT)),
        tools,
        &[
            "lookup_trip_data",
            "get_trip_statistics",
            "search_trips",
            "current_date_tool",
            "current_time_tool",
            "cancel_upcoming_trip_or_booking",
            "display_seat_map",
        ],
    );

    let registry = AgentRegistry::new(default_agent, vec![triage, faq, trips])?;
    registry.validate_handoffs()?;
    Ok(registry)
}

fn with_tools(mut agent: AgentDefinition, tools: &ToolRegistry, names: &[&str]) -> AgentDefinition {
    for name in names {
        match tools.contract(name) {
            Some(contract) => agent = agent.with_tool(contract),
            None => warn!(agent = %agent.name, tool = %name, "Tool not registered, skipping"),
        }
    }
    agent
}

/// Wire the airline roster, tools, and a store into an [`Orchestrator`]
/// configured from `config`.
pub fn airline_orchestrator(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    tools: &ToolRegistry,
    store: Arc<dyn ConversationStore>,
) -> Result<Orchestrator, RegistryError> {
    let registry = airline_registry(
        config.active_model(),
        &config.orchestrator.default_agent,
        tools,
    )?;
    let caller = RetryingCachingCaller::from_config(provider, &config.orchestrator);

    Ok(Orchestrator::new(
        Arc::new(registry),
        Arc::new(caller),
        store,
        Arc::new(AirlineContextInitializer),
        EventStreamBuilder::new(config.orchestrator.ui_trigger_tool.clone()),
    ))
}

/// Keyword-scripted stand-in for the model, used by `waypoint chat --offline`.
pub fn offline_provider(tools: Arc<ToolRegistry>) -> ScriptedProvider {
    ScriptedProvider::new(tools)
        .rule(
            TRIAGE_AGENT,
            &["bag", "wifi", "plane", "how many seats"],
            vec![ScriptStep::handoff(FAQ_AGENT)],
        )
        .rule(
            TRIAGE_AGENT,
            &["seat", "trip", "booking", "cancel", "flight"],
            vec![ScriptStep::handoff(TRIP_AGENT)],
        )
        .rule(
            TRIAGE_AGENT,
            &["statistic", "stats"],
            vec![
                ScriptStep::tool("get_trip_statistics", json!({})),
                ScriptStep::RelayToolOutput,
            ],
        )
        .rule(
            TRIAGE_AGENT,
            &[],
            vec![ScriptStep::say(
                "Hello! I can answer airline questions or help with your trips. What do you need?",
            )],
        )
        .rule(
            FAQ_AGENT,
            &["bag", "wifi", "plane", "seats"],
            vec![
                ScriptStep::ask("faq_lookup_tool", "question"),
                ScriptStep::RelayToolOutput,
            ],
        )
        .rule(FAQ_AGENT, &[], vec![ScriptStep::handoff(TRIAGE_AGENT)])
        .rule(
            TRIP_AGENT,
            &["seat"],
            vec![
                ScriptStep::tool("display_seat_map", json!({})),
                ScriptStep::say("Please pick your new seat from the seat map."),
            ],
        )
        .rule(
            TRIP_AGENT,
            &["date", "today"],
            vec![
                ScriptStep::tool("current_date_tool", json!({})),
                ScriptStep::RelayToolOutput,
            ],
        )
        .rule(
            TRIP_AGENT,
            &["statistic", "stats"],
            vec![
                ScriptStep::tool("get_trip_statistics", json!({})),
                ScriptStep::RelayToolOutput,
            ],
        )
        .rule(
            TRIP_AGENT,
            &[],
            vec![ScriptStep::say(
                "I can look up, search, or cancel trips. What is your booking reference?",
            )],
        )
        .with_default_reply("I'm not sure how to help with that.")
}
