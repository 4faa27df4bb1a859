//! # Scan Agent
//!
//! Runs one code-repository security scan through a tool-augmented language
//! model agent and tracks the scan task's lifecycle in a persistent store.
//!
//! ## Features
//!
//! - **Task lifecycle** - `PENDING` → `IN_PROGRESS` → `COMPLETED` / `FAILED` / `ERROR`
//! - **Source-specific identity** - repository URL and commit derived from GitHub, Bitbucket or CLI arguments
//! - **Lazy agent** - model and tools are built once, on first use, even under concurrent calls
//! - **MCP tools** - tool catalog fetched from an MCP server over streamable HTTP
//! - **SQLite storage** - tasks and encrypted configuration via `sqlx`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan_agent::agent::{LazyAgent, ReactBackend, ToolsFactory};
//! use scan_agent::testing::{InMemoryTaskRepository, fixtures};
//! use scan_agent::tools::McpToolsFactory;
//! use scan_agent::{AnalyseCodeUseCase, LlmModelFactory, PromptTemplate};
//! use llm::Provider;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let agent: LazyAgent<ReactBackend> = LazyAgent::new(
//!     "You are a security auditor. Answer with a JSON object.",
//!     Arc::new(LlmModelFactory::new(Provider::OpenAi, "gpt-4o", "sk-...", Duration::from_secs(60))),
//!     ToolsFactory::Async(Arc::new(McpToolsFactory::new("http://localhost:3000/mcp", Duration::from_secs(60)))),
//!     ReactBackend::default(),
//! );
//!
//! let tasks = Arc::new(InMemoryTaskRepository::with_tasks([fixtures::github_task("t1")]));
//! let use_case = AnalyseCodeUseCase::new(tasks, Arc::new(agent), PromptTemplate::new(fixtures::TEMPLATE));
//! let task = use_case.execute("t1").await?;
//! println!("{}", task.status);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod ports;
pub mod prompt;
pub mod secrets;
pub mod testing;
pub mod tools;

pub use agent::{
    Agent, AgentMessage, AgentResponse, LazyAgent, LlmModelFactory, ReactBackend, ToolsFactory,
    DEFAULT_TEMPERATURE,
};
pub use application::{AnalyseCodeUseCase, AnalysisOutcome};
pub use config::{ScanConfig, Settings};
pub use domain::{Task, TaskSource, TaskStatus};
pub use error::{Result, ScanError};
pub use persistence::{Database, SqliteConfigurationProvider, SqliteTaskRepository};
pub use ports::{ConfigurationProvider, EncryptionService, SecretsProvider, TaskRepository};
pub use prompt::PromptTemplate;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
