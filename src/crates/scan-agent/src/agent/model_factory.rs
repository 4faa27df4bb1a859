//! Chat model construction from the scan configuration.

use super::ModelFactory;
use crate::error::{Result, ScanError};
use llm::{ChatModel, Provider, RemoteLlmConfig};
use std::sync::Arc;
use std::time::Duration;

/// Builds a remote chat model for the configured provider.
#[derive(Clone)]
pub struct LlmModelFactory {
    provider: Provider,
    model: String,
    api_key: String,
    timeout: Duration,
    base_url: Option<String>,
}

impl LlmModelFactory {
    pub fn new(
        provider: Provider,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: api_key.into(),
            timeout,
            base_url: None,
        }
    }

    /// Send requests somewhere other than the provider's public endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }
}

impl std::fmt::Debug for LlmModelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmModelFactory")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ModelFactory<Arc<dyn ChatModel>> for LlmModelFactory {
    fn create_model(&self) -> Result<Arc<dyn ChatModel>> {
        if self.api_key.trim().is_empty() {
            return Err(ScanError::Factory(format!(
                "API key required for {} provider",
                self.provider
            )));
        }

        let mut config = RemoteLlmConfig::for_provider(self.provider, &self.api_key, &self.model)
            .with_timeout(self.timeout);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }

        self.provider
            .create_client(config)
            .map_err(|e| ScanError::Factory(format!("Failed to create {} client: {}", self.provider, e)))
    }
}
