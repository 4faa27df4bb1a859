//! Error types for the scan agent.

use thiserror::Error;

/// Result type alias for scan agent operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Main error type for scan agent operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Task or configuration key does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identity derivation lacks a required task argument.
    #[error("Missing required argument: {key}")]
    MissingArgument { key: String },

    /// The agent answered with a status literal outside the contract.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// The agent answer is not a JSON object of the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A model or tools factory failed to produce its value.
    #[error("Factory error: {0}")]
    Factory(String),

    /// Missing or invalid key material, or undecryptable ciphertext.
    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM error: {0}")]
    Llm(#[from] llm::LlmError),

    /// Tool execution or tool-serving endpoint error.
    #[error("Tool error: {0}")]
    Tool(String),

    /// The reasoning loop did not produce an answer.
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl ScanError {
    pub fn missing_argument(key: impl Into<String>) -> Self {
        Self::MissingArgument { key: key.into() }
    }

    /// Whether the error comes from the task store rather than the analysis itself.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Sqlx(_))
    }
}
