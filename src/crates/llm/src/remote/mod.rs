//! Remote LLM provider implementations.
//!
//! # Providers
//!
//! - **OpenAI** - Chat Completions API (GPT-4o, o-series)
//! - **Claude** - Anthropic Messages API
//! - **Gemini** - Google `generateContent` API

pub mod claude;
pub mod gemini;
pub mod openai;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use serde::de::DeserializeOwned;

pub(crate) fn build_http_client(config: &RemoteLlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| LlmError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Check the status and decode the JSON body of a provider response.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::warn!(provider, status = status.as_u16(), "LLM request failed");
        return Err(LlmError::from_status(provider, status, error_text));
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))
}
