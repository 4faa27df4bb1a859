//! Remote LLM chat clients for titvo-scan.
//!
//! Every provider implements [`ChatModel`]: a single request/response call
//! that carries the conversation, the tools on offer and sampling options,
//! and returns an assistant [`Message`] that may request tool calls.
//!
//! # Providers
//!
//! - **OpenAI** - [`remote::OpenAiClient`]
//! - **Anthropic** - [`remote::ClaudeClient`]
//! - **Google** - [`remote::GeminiClient`]
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{ChatModel, ChatRequest, Message, Provider, RemoteLlmConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider: Provider = "anthropic".parse()?;
//!     let config = RemoteLlmConfig::for_provider(provider, "sk-...", "claude-3-5-sonnet-latest");
//!     let client = provider.create_client(config)?;
//!
//!     let request = ChatRequest::new(vec![
//!         Message::system("You are a security reviewer."),
//!         Message::user("Is eval() dangerous?"),
//!     ])
//!     .with_temperature(0.0);
//!
//!     let response = client.chat(request).await?;
//!     println!("{}", response.message.content);
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod messages;
pub mod provider;
pub mod remote;

pub use chat::{ChatModel, ChatRequest, ChatResponse, UsageMetadata};
pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use messages::{Message, MessageRole, ToolCall, ToolDefinition};
pub use provider::Provider;
