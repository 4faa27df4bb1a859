//! Configuration
//!
//! Two layers: process [`Settings`] from an optional TOML file, and the
//! [`ScanConfig`] read through the configuration port before any task is
//! touched.

pub mod loader;
pub mod schema;

pub use loader::{SettingsLoader, DEFAULT_SETTINGS_FILE};
pub use schema::{AgentSettings, DatabaseSettings, LoggingSettings, SecretsSettings, Settings};

use crate::error::{Result, ScanError};
use crate::ports::ConfigurationProvider;
use llm::Provider;

pub const MCP_SERVER_URL: &str = "mcp_server_url";
pub const SCAN_SYSTEM_PROMPT: &str = "scan_system_prompt";
pub const CONTENT_TEMPLATE: &str = "content_template";
pub const IA_PROVIDER: &str = "ia_provider";
pub const IA_MODEL: &str = "ia_model";
pub const IA_API_KEY: &str = "ia_api_key";

/// Everything a scan run needs from the configuration store.
#[derive(Clone)]
pub struct ScanConfig {
    pub mcp_server_url: String,
    pub system_prompt: String,
    pub content_template: String,
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
}

impl std::fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanConfig")
            .field("mcp_server_url", &self.mcp_server_url)
            .field("system_prompt", &self.system_prompt)
            .field("content_template", &self.content_template)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ScanConfig {
    /// Read every scan parameter. Any missing key is an error.
    pub async fn load(config: &dyn ConfigurationProvider) -> Result<Self> {
        let provider = config.get_value(IA_PROVIDER).await?;
        let provider: Provider = provider
            .parse()
            .map_err(|e| ScanError::Config(format!("{}: {}", IA_PROVIDER, e)))?;

        let api_key = config
            .get_secret(IA_API_KEY)
            .await?
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ScanError::Config(format!("Secret not configured: {}", IA_API_KEY)))?;

        Ok(Self {
            mcp_server_url: config.get_value(MCP_SERVER_URL).await?,
            system_prompt: config.get_value(SCAN_SYSTEM_PROMPT).await?,
            content_template: config.get_value(CONTENT_TEMPLATE).await?,
            provider,
            model: config.get_value(IA_MODEL).await?,
            api_key,
        })
    }
}
