//! Tools the agent may call while reasoning.
//!
//! A tool is either provided locally through [`StaticToolsFactory`] or
//! fetched from a remote MCP server through [`McpToolsFactory`].

pub mod mcp;

pub use mcp::{McpClient, McpTool, McpToolInfo, McpToolsFactory};

use crate::agent::SyncToolsFactory;
use crate::error::Result;
use async_trait::async_trait;
use llm::ToolDefinition;
use serde_json::Value;
use std::sync::Arc;

/// A callable capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the accepted input.
    fn input_schema(&self) -> Value;

    async fn execute(&self, input: Value) -> Result<Value>;

    /// Definition sent to the model, advertised under `name()`.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
        }
    }
}

/// Synchronous tools factory over a fixed tool list.
#[derive(Clone, Default)]
pub struct StaticToolsFactory {
    tools: Vec<Arc<dyn Tool>>,
}

impl StaticToolsFactory {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl SyncToolsFactory for StaticToolsFactory {
    fn create_tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
        Ok(self.tools.clone())
    }
}
