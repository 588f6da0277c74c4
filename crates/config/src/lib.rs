//! Configuration loading, validation, and management for Waypoint.
//!
//! Loads configuration from `~/.waypoint/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.waypoint/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model backend kind ("openai" or "scripted")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_fast_model")]
    pub fast_model: String,

    #[serde(default = "default_premium_model")]
    pub premium_model: String,

    /// Run every agent on the fast model
    #[serde(default = "default_true")]
    pub use_fast_model: bool,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_fast_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_premium_model() -> String {
    "gpt-4".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("fast_model", &self.fast_model)
            .field("premium_model", &self.premium_model)
            .field("use_fast_model", &self.use_fast_model)
            .field("temperature", &self.temperature)
            .field("orchestrator", &self.orchestrator)
            .field("gateway", &self.gateway)
            .field("store", &self.store)
            .finish()
    }
}

/// Turn orchestration and call-policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Minimum spacing between outbound model calls
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Attempts per call before falling back
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-entry character cap before a call
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,

    /// Transcript entries kept per call (the first entry always survives)
    #[serde(default = "default_max_conversation_history")]
    pub max_conversation_history: usize,

    #[serde(default = "default_true")]
    pub cache_responses: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Context fields forwarded to the model and fingerprinted
    #[serde(default = "default_context_allow_list")]
    pub context_allow_list: Vec<String>,

    #[serde(default = "default_agent")]
    pub default_agent: String,

    /// Tool whose invocation emits the UI sentinel message
    #[serde(default = "default_ui_trigger_tool")]
    pub ui_trigger_tool: String,
}

fn default_rate_limit_delay_ms() -> u64 {
    1000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2000
}
fn default_max_context_length() -> usize {
    4000
}
fn default_max_conversation_history() -> usize {
    10
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_context_allow_list() -> Vec<String> {
    [
        "passenger_name",
        "confirmation_number",
        "flight_number",
        "booking_reference",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_agent() -> String {
    "Triage Agent".into()
}
fn default_ui_trigger_tool() -> String {
    "display_seat_map".into()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_context_length: default_max_context_length(),
            max_conversation_history: default_max_conversation_history(),
            cache_responses: true,
            cache_ttl_secs: default_cache_ttl_secs(),
            context_allow_list: default_context_allow_list(),
            default_agent: default_agent(),
            ui_trigger_tool: default_ui_trigger_tool(),
        }
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Conversation persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "file"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// JSON file used by the file backend
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_backend() -> String {
    "memory".into()
}
fn default_store_path() -> PathBuf {
    AppConfig::config_dir().join("conversations.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.waypoint/config.toml).
    ///
    /// Environment overrides:
    /// - `WAYPOINT_API_KEY`, then `OPENAI_API_KEY`, when no key is configured
    /// - `WAYPOINT_MODEL` replaces the fast model
    /// - `WAYPOINT_API_URL` replaces the API base URL
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("WAYPOINT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("WAYPOINT_MODEL") {
            self.fast_model = model;
        }

        if let Ok(url) = std::env::var("WAYPOINT_API_URL") {
            self.api_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".waypoint")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let o = &self.orchestrator;
        if o.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_retries must be at least 1".into(),
            ));
        }
        if o.max_conversation_history == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_conversation_history must be at least 1".into(),
            ));
        }
        if o.max_context_length == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_context_length must be > 0".into(),
            ));
        }
        if o.default_agent.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "orchestrator.default_agent must not be empty".into(),
            ));
        }

        match self.store.backend.as_str() {
            "memory" | "file" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown store backend '{other}' (expected 'memory' or 'file')"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The model every agent runs on.
    pub fn active_model(&self) -> &str {
        if self.use_fast_model {
            &self.fast_model
        } else {
            &self.premium_model
        }
    }

    /// Render the defaults as TOML (for `status --print-config`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: default_api_url(),
            fast_model: default_fast_model(),
            premium_model: default_premium_model(),
            use_fast_model: true,
            temperature: default_temperature(),
            orchestrator: OrchestratorConfig::default(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
