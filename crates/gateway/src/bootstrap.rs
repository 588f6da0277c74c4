//! Assemble an orchestrator from configuration.
//!
//! Shared by `waypoint serve` and `waypoint chat`, so both surfaces run
//! the same provider, store, and roster wiring.

use std::sync::Arc;
use tracing::{info, warn};
use waypoint_agent::{Orchestrator, airline_orchestrator, offline_provider};
use waypoint_config::AppConfig;
use waypoint_core::{ConversationStore, Error, Provider, Result, ToolRegistry};
use waypoint_providers::OpenAiCompatProvider;
use waypoint_store::{FileConversationStore, InMemoryConversationStore};

/// The model runner: the configured OpenAI-compatible endpoint, or the
/// scripted runner when `offline` is set or no API key is available.
pub fn build_provider(
    config: &AppConfig,
    tools: Arc<ToolRegistry>,
    offline: bool,
) -> Result<Arc<dyn Provider>> {
    if offline {
        info!("Using offline scripted provider");
        return Ok(Arc::new(offline_provider(tools)));
    }

    let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
        warn!("No API key configured, falling back to the offline scripted provider");
        return Ok(Arc::new(offline_provider(tools)));
    };

    let provider = OpenAiCompatProvider::new(&config.provider, &config.api_url, api_key, tools)?
        .with_temperature(config.temperature);
    info!(
        provider = %config.provider,
        model = %config.active_model(),
        "Using model provider"
    );
    Ok(Arc::new(provider))
}

/// The conversation store selected by `[store] backend`.
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn ConversationStore>> {
    match config.store.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryConversationStore::new())),
        "file" => {
            let store = FileConversationStore::open(&config.store.path).await?;
            info!(path = %config.store.path.display(), "Using file conversation store");
            Ok(Arc::new(store))
        }
        other => Err(Error::Internal(format!("Unknown store backend: {other}"))),
    }
}

/// Provider, store, tools, and roster wired into one orchestrator.
pub async fn build_orchestrator(config: &AppConfig, offline: bool) -> Result<Orchestrator> {
    let tools = Arc::new(waypoint_tools::default_registry());
    let provider = build_provider(config, tools.clone(), offline)?;
    let store = build_store(config).await?;
    Ok(airline_orchestrator(config, provider, &tools, store)?)
}
