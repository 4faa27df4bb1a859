//! Process settings schema for the scan agent

use serde::{Deserialize, Serialize};

/// Process-level settings read from `scan-agent.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub agent: AgentSettings,

    #[serde(default)]
    pub secrets: SecretsSettings,
}

/// Database settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite connection URL, e.g. `sqlite:scan-agent.db` or `sqlite::memory:`
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite:scan-agent.db".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,

    /// Output format: compact, pretty, json
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Agent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Upper bound on model round trips per invocation
    pub max_iterations: usize,

    /// Timeout for model and tool endpoint requests, in seconds
    pub request_timeout_secs: u64,

    /// Token budget per model response
    pub max_tokens: Option<usize>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            request_timeout_secs: 120,
            max_tokens: None,
        }
    }
}

impl AgentSettings {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Secrets settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsSettings {
    /// Environment variable holding the base64 AES-256 key
    pub encryption_key_name: String,
}

impl Default for SecretsSettings {
    fn default() -> Self {
        Self {
            encryption_key_name: "TITVO_ENCRYPTION_KEY".to_string(),
        }
    }
}
