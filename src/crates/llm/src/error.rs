//! Errors raised by the chat model clients.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Failure of a chat call, from transport to response decoding.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport failure, including timeouts.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 401/403 from the provider.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// No key in the provider's environment variable.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Provider name is not one of the supported providers.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// 429 from the provider.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// 400 from the provider.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The reply body does not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Any other non-success status.
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Transient failures a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::HttpError(_) | LlmError::RateLimitExceeded(_))
    }

    /// Whether the credentials are missing or were rejected.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            LlmError::AuthenticationError(_) | LlmError::ApiKeyNotFound(_)
        )
    }

    /// Map a non-success HTTP status to the matching error variant.
    pub(crate) fn from_status(provider: &str, status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::AuthenticationError(body),
            429 => LlmError::RateLimitExceeded(body),
            400 => LlmError::InvalidRequest(format!("{} API error {}: {}", provider, status, body)),
            _ => LlmError::ProviderError(format!("{} API error {}: {}", provider, status, body)),
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}
