//! `run` command: set everything up, then scan one task

use crate::agent::{LazyAgent, LlmModelFactory, ReactBackend, ToolsFactory};
use crate::application::AnalyseCodeUseCase;
use crate::config::{AgentSettings, ScanConfig, Settings};
use crate::domain::Task;
use crate::error::{Result, ScanError};
use crate::persistence::SqliteTaskRepository;
use crate::prompt::PromptTemplate;
use crate::tools::mcp::McpToolsFactory;
use std::sync::Arc;
use tracing::info;

/// Agent backed by the configured provider and the MCP server's tools.
pub fn build_agent(agent: &AgentSettings, scan: &ScanConfig) -> LazyAgent<ReactBackend> {
    let model_factory = LlmModelFactory::new(
        scan.provider,
        &scan.model,
        &scan.api_key,
        agent.request_timeout(),
    );
    let tools_factory = McpToolsFactory::new(&scan.mcp_server_url, agent.request_timeout());

    let mut backend = ReactBackend::new(agent.max_iterations);
    if let Some(max_tokens) = agent.max_tokens {
        backend = backend.with_max_tokens(max_tokens);
    }

    LazyAgent::new(
        &scan.system_prompt,
        Arc::new(model_factory),
        ToolsFactory::Async(Arc::new(tools_factory)),
        backend,
    )
}

/// Run the scan for `task_id`.
///
/// Setup failures return before the task is read.
pub async fn handle_run(settings: &Settings, task_id: Option<String>) -> Result<Task> {
    let task_id = task_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ScanError::Config("No task id given (TITVO_SCAN_TASK_ID)".to_string()))?;

    let db = super::open_database(settings).await?;
    let configuration = super::configuration_provider(settings, db.clone());
    let scan = ScanConfig::load(&configuration).await?;
    info!(provider = %scan.provider, model = %scan.model, "Scan configuration loaded");

    let use_case = AnalyseCodeUseCase::new(
        Arc::new(SqliteTaskRepository::new(db.clone())),
        Arc::new(build_agent(&settings.agent, &scan)),
        PromptTemplate::new(&scan.content_template),
    );

    let task = use_case.execute(&task_id).await;
    db.close().await;
    task
}
