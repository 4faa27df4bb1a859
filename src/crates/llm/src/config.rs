//! Connection settings shared by the remote chat clients.

use crate::error::{LlmError, Result};
use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoint, credentials and limits for one remote chat model.
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    pub api_key: String,

    /// Provider root, without a trailing path; see [`Provider::default_base_url`].
    pub base_url: String,

    pub model: String,

    /// Applies to the whole request, body included.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Default completion budget when a request does not set one.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Sent as `OpenAI-Organization`; ignored by the other providers.
    pub organization: Option<String>,
}

impl RemoteLlmConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout: default_timeout(),
            max_tokens: default_max_tokens(),
            organization: None,
        }
    }

    /// Create a configuration pointing at the provider's public endpoint.
    pub fn for_provider(
        provider: Provider,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(api_key, provider.default_base_url(), model)
    }

    /// Read the API key from `env_var`.
    pub fn from_env(
        env_var: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .map_err(|_| LlmError::ApiKeyNotFound(format!("Environment variable: {}", env_var)))?;

        Ok(Self::new(api_key, base_url, model))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the base URL (proxies, mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the default completion budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

// The API key must never end up in logs.
impl std::fmt::Debug for RemoteLlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .field("organization", &self.organization)
            .finish()
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_tokens() -> usize {
    4096
}
