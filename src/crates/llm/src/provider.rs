//! Supported remote providers and client construction.

use crate::chat::ChatModel;
use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::remote::{ClaudeClient, GeminiClient, OpenAiClient};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Remote LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
        }
    }

    /// Public API endpoint of the provider.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Google => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Build a chat model client for this provider.
    pub fn create_client(&self, config: RemoteLlmConfig) -> Result<Arc<dyn ChatModel>> {
        let client: Arc<dyn ChatModel> = match self {
            Self::OpenAi => Arc::new(OpenAiClient::new(config)?),
            Self::Anthropic => Arc::new(ClaudeClient::new(config)?),
            Self::Google => Arc::new(GeminiClient::new(config)?),
        };
        Ok(client)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "google" | "gemini" => Ok(Self::Google),
            other => Err(LlmError::UnsupportedProvider(format!(
                "{}. Available: openai, anthropic, google",
                other
            ))),
        }
    }
}
