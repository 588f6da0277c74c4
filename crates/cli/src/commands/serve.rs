//! `waypoint serve`: start the HTTP API server.

use waypoint_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Waypoint Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Origins:   {}", config.gateway.allowed_origins.join(", "));
    println!("   Store:     {}", config.store.backend);

    waypoint_gateway::start(config).await?;

    Ok(())
}
