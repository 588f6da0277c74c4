//! `waypoint status`: show configuration status.

use waypoint_config::AppConfig;

pub fn run(print_config: bool) -> Result<(), Box<dyn std::error::Error>> {
    if print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let orchestrator = &config.orchestrator;

    println!("Waypoint Status");
    println!("===============");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Provider:       {} ({})", config.provider, config.api_url);
    println!("  Model:          {}", config.active_model());
    println!(
        "  API key:        {}",
        if config.has_api_key() { "set" } else { "missing (offline mode)" }
    );
    println!("  Default agent:  {}", orchestrator.default_agent);
    println!("  Rate limit:     {}ms between calls", orchestrator.rate_limit_delay_ms);
    println!(
        "  Retries:        {} attempts, {}ms base backoff",
        orchestrator.max_retries, orchestrator.retry_delay_ms
    );
    println!(
        "  Cache:          {}",
        if orchestrator.cache_responses {
            format!("on ({}s TTL)", orchestrator.cache_ttl_secs)
        } else {
            "off".to_string()
        }
    );
    println!("  Store:          {}", config.store.backend);
    println!("  Gateway:        {}:{}", config.gateway.host, config.gateway.port);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, using defaults (see `waypoint status --print-config`)");
    }

    Ok(())
}
