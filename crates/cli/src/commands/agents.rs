//! `waypoint agents`: list the agent roster.

use waypoint_agent::airline_registry;
use waypoint_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let tools = waypoint_tools::default_registry();
    let registry = airline_registry(
        config.active_model(),
        &config.orchestrator.default_agent,
        &tools,
    )?;
    let default_agent = registry.default_agent().name.clone();

    for agent in registry.roster() {
        let marker = if agent.name == default_agent { " (default)" } else { "" };
        println!("{}{marker}", agent.name);
        println!("  {}", agent.description);
        println!("  tools:    {}", agent.tools.join(", "));
        println!("  handoffs: {}", agent.handoffs.join(", "));
        println!();
    }

    Ok(())
}
