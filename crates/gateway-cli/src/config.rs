//! Static, once-loaded deployment configuration: plain env vars parsed at
//! startup, no hot-reload, no `notify`-watched config file.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// One §6-listed LLM credential, resolved at startup.
pub struct ModelProviderConfig {
    pub api_key: String,
    pub default_model: String,
    pub fast_model: Option<String>,
}

pub struct CliConfig {
    pub service_port: u16,
    pub cors_origins: Vec<String>,
    pub provider: ModelProviderConfig,
    pub conversation_store_type: ConversationStoreType,
    pub data_dir: String,
    pub artifact_store_url: String,
    pub external_data_base_url: String,
    pub external_data_timeout: Duration,
    pub debug: bool,
    pub native_agent_enabled: bool,
    pub max_tool_calls: u32,
    pub max_turn_duration: Duration,
    pub per_tool_timeout: Duration,
    pub heartbeat_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationStoreType {
    Memory,
    Sqlite,
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or_default<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_non_empty(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue { name: key, value: raw }),
        None => Ok(default),
    }
}

impl CliConfig {
    /// Parse every §6 env var, failing fast on a missing required one
    /// (`MODEL_PROVIDER`'s API key) rather than falling back to a mock.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_non_empty("ANTHROPIC_API_KEY").ok_or(ConfigError::MissingVar("ANTHROPIC_API_KEY"))?;
        let default_model = env_non_empty("DEFAULT_MODEL").unwrap_or_else(|| "claude-sonnet-4-5".to_owned());
        let fast_model = env_non_empty("FAST_MODEL");

        let conversation_store_type = match env_non_empty("CONVERSATION_STORE_TYPE").as_deref() {
            Some("memory") | None => ConversationStoreType::Memory,
            Some("remote-kv") | Some("sqlite") => ConversationStoreType::Sqlite,
            Some(other) => {
                return Err(ConfigError::InvalidValue { name: "CONVERSATION_STORE_TYPE", value: other.to_owned() })
            }
        };

        let cors_origins = env_non_empty("CORS_ORIGINS")
            .map(|raw| raw.split(',').map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Ok(Self {
            service_port: env_or_default("SERVICE_PORT", 5000)?,
            cors_origins,
            provider: ModelProviderConfig { api_key, default_model, fast_model },
            conversation_store_type,
            data_dir: env_non_empty("DATA_DIR").unwrap_or_else(|| "data".to_owned()),
            artifact_store_url: env_non_empty("ARTIFACT_STORE_URL").unwrap_or_else(|| "data/gateway.db".to_owned()),
            external_data_base_url: env_non_empty("EXTERNAL_DATA_BASE_URL")
                .unwrap_or_else(|| "http://localhost:4000".to_owned()),
            external_data_timeout: Duration::from_secs(env_or_default("EXTERNAL_DATA_TIMEOUT", 15)?),
            debug: env_or_default("DEBUG", false)?,
            native_agent_enabled: env_or_default("NATIVE_AGENT_ENABLED", true)?,
            max_tool_calls: env_or_default("MAX_TOOL_CALLS", 10)?,
            max_turn_duration: Duration::from_secs(env_or_default("MAX_TURN_DURATION_S", 120)?),
            per_tool_timeout: Duration::from_secs(env_or_default("PER_TOOL_TIMEOUT_S", 30)?),
            heartbeat_interval: Duration::from_secs(env_or_default("HEARTBEAT_INTERVAL_S", 15)?),
        })
    }
}
