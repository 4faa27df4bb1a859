//! Agent abstraction
//!
//! A [`LazyAgent`] owns a system prompt, a model factory and a tools factory.
//! On first use it builds the tools, then the model, and hands both to its
//! [`AgentBackend`] to combine into a runnable agent. Initialization is
//! single-flight: concurrent first calls wait on the same build, and a failed
//! build is retried on the next call.

pub mod model_factory;
pub mod react;
pub mod sanitize;

pub use model_factory::LlmModelFactory;
pub use react::{ReactAgent, ReactBackend};
pub use sanitize::sanitize_tool_name;

use crate::error::{Result, ScanError};
use crate::tools::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Temperature used when the caller has no preference.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Message sent to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: String,
    pub content: String,
}

impl AgentMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Normalized agent answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Uniform invocation contract.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn invoke(&self, message: &AgentMessage, temperature: f32) -> Result<AgentResponse>;
}

/// Builds the model an agent reasons with.
pub trait ModelFactory<M>: Send + Sync {
    fn create_model(&self) -> Result<M>;
}

/// Builds tools without suspending.
pub trait SyncToolsFactory: Send + Sync {
    fn create_tools(&self) -> Result<Vec<Arc<dyn Tool>>>;
}

/// Builds tools from an external source, such as a remote tool catalog.
#[async_trait]
pub trait AsyncToolsFactory: Send + Sync {
    async fn create_tools(&self) -> Result<Vec<Arc<dyn Tool>>>;
}

/// The two tool factory shapes an agent accepts.
#[derive(Clone)]
pub enum ToolsFactory {
    Sync(Arc<dyn SyncToolsFactory>),
    /// Tool names are sanitized before they reach the model.
    Async(Arc<dyn AsyncToolsFactory>),
}

impl ToolsFactory {
    async fn build(&self) -> Result<Vec<Arc<dyn Tool>>> {
        match self {
            Self::Sync(factory) => factory.create_tools(),
            Self::Async(factory) => Ok(expose_sanitized(factory.create_tools().await?)),
        }
    }
}

/// Provider-specific combine and run steps.
#[async_trait]
pub trait AgentBackend: Send + Sync + 'static {
    type Model: Send + Sync;
    type Runnable: Send + Sync;

    /// Assemble model and tools into a ready-to-invoke agent.
    fn combine(
        &self,
        system_prompt: &str,
        model: Self::Model,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<Self::Runnable>;

    async fn run(
        &self,
        runnable: &Self::Runnable,
        message: &AgentMessage,
        temperature: f32,
    ) -> Result<AgentResponse>;
}

/// Agent whose model and tools are built on first invocation.
pub struct LazyAgent<B: AgentBackend> {
    system_prompt: String,
    model_factory: Arc<dyn ModelFactory<B::Model>>,
    tools_factory: ToolsFactory,
    backend: B,
    runnable: OnceCell<B::Runnable>,
}

impl<B: AgentBackend> LazyAgent<B> {
    pub fn new(
        system_prompt: impl Into<String>,
        model_factory: Arc<dyn ModelFactory<B::Model>>,
        tools_factory: ToolsFactory,
        backend: B,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            model_factory,
            tools_factory,
            backend,
            runnable: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.runnable.initialized()
    }

    /// Build and combine model and tools once. Later calls return the cached agent.
    pub async fn ensure_initialized(&self) -> Result<&B::Runnable> {
        self.runnable.get_or_try_init(|| self.initialize()).await
    }

    async fn initialize(&self) -> Result<B::Runnable> {
        let tools = self.tools_factory.build().await.map_err(as_factory_error)?;
        let model = self.model_factory.create_model().map_err(as_factory_error)?;

        info!(tools = tools.len(), "Agent initialized");
        self.backend.combine(&self.system_prompt, model, tools)
    }
}

#[async_trait]
impl<B: AgentBackend> Agent for LazyAgent<B> {
    async fn invoke(&self, message: &AgentMessage, temperature: f32) -> Result<AgentResponse> {
        let runnable = self.ensure_initialized().await?;
        debug!(role = %message.role, temperature, "Invoking agent");
        self.backend.run(runnable, message, temperature).await
    }
}

fn as_factory_error(err: ScanError) -> ScanError {
    match err {
        ScanError::Factory(_) => err,
        other => ScanError::Factory(other.to_string()),
    }
}

/// Wrap tools so they are advertised under their sanitized names.
///
/// Tools whose name sanitizes to nothing, or collides with an earlier tool,
/// are dropped.
fn expose_sanitized(tools: Vec<Arc<dyn Tool>>) -> Vec<Arc<dyn Tool>> {
    let mut seen = HashSet::new();
    let mut exposed: Vec<Arc<dyn Tool>> = Vec::with_capacity(tools.len());

    for tool in tools {
        let name = sanitize_tool_name(tool.name());
        if name.is_empty() {
            warn!(tool = %tool.name(), "Dropping tool with unusable name");
            continue;
        }
        if !seen.insert(name.clone()) {
            warn!(tool = %tool.name(), sanitized = %name, "Dropping tool with duplicate name");
            continue;
        }
        if name == tool.name() {
            exposed.push(tool);
        } else {
            exposed.push(Arc::new(SanitizedTool { name, inner: tool }));
        }
    }

    exposed
}

/// A tool advertised under a different name than its provider uses.
struct SanitizedTool {
    name: String,
    inner: Arc<dyn Tool>,
}

#[async_trait]
impl Tool for SanitizedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> Value {
        self.inner.input_schema()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        self.inner.execute(input).await
    }
}
