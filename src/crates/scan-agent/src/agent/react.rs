//! ReAct backend: the model reasons, calls tools, observes the results and
//! repeats until it answers without requesting a tool.

use super::{AgentBackend, AgentMessage, AgentResponse};
use crate::error::{Result, ScanError};
use crate::tools::Tool;
use async_trait::async_trait;
use llm::{ChatModel, ChatRequest, Message, ToolCall, ToolDefinition, UsageMetadata};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_MAX_ITERATIONS: usize = 25;

/// Combines a chat model and tools into a [`ReactAgent`].
#[derive(Debug, Clone)]
pub struct ReactBackend {
    max_iterations: usize,
    max_tokens: Option<usize>,
}

impl Default for ReactBackend {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tokens: None,
        }
    }
}

impl ReactBackend {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            ..Default::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A model bound to a system prompt and a tool set.
pub struct ReactAgent {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    tools: HashMap<String, Arc<dyn Tool>>,
    definitions: Vec<ToolDefinition>,
}

impl ReactAgent {
    pub fn tool_names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }

    async fn call_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return format!("Error: unknown tool '{}'", call.name);
        };

        match tool.execute(call.arguments.clone()).await {
            Ok(Value::String(text)) => text,
            Ok(other) => other.to_string(),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                format!("Error: {}", e)
            }
        }
    }
}

fn to_llm_message(message: &AgentMessage) -> Message {
    match message.role.as_str() {
        "system" => Message::system(&message.content),
        "assistant" => Message::assistant(&message.content),
        _ => Message::user(&message.content),
    }
}

#[async_trait]
impl AgentBackend for ReactBackend {
    type Model = Arc<dyn ChatModel>;
    type Runnable = ReactAgent;

    fn combine(
        &self,
        system_prompt: &str,
        model: Arc<dyn ChatModel>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<ReactAgent> {
        let definitions = tools.iter().map(|t| t.definition()).collect();
        let tools = tools
            .into_iter()
            .map(|t| (t.name().to_string(), t))
            .collect();

        Ok(ReactAgent {
            model,
            system_prompt: system_prompt.to_string(),
            tools,
            definitions,
        })
    }

    async fn run(
        &self,
        agent: &ReactAgent,
        message: &AgentMessage,
        temperature: f32,
    ) -> Result<AgentResponse> {
        let mut messages = Vec::new();
        if !agent.system_prompt.is_empty() {
            messages.push(Message::system(&agent.system_prompt));
        }
        messages.push(to_llm_message(message));

        let mut usage = UsageMetadata::default();
        let mut tool_calls = 0usize;

        for iteration in 1..=self.max_iterations {
            let mut request = ChatRequest::new(messages.clone())
                .with_tools(agent.definitions.clone())
                .with_temperature(temperature);
            if let Some(max_tokens) = self.max_tokens {
                request = request.with_max_tokens(max_tokens);
            }

            let response = agent.model.chat(request).await?;
            if let Some(u) = &response.usage {
                usage.accumulate(u);
            }

            if !response.message.has_tool_calls() {
                debug!(iteration, tool_calls, "Agent produced a final answer");

                let mut metadata = Map::new();
                metadata.insert("model".to_string(), json!(agent.model.model_name()));
                metadata.insert("iterations".to_string(), json!(iteration));
                metadata.insert("tool_calls".to_string(), json!(tool_calls));
                metadata.insert("usage".to_string(), serde_json::to_value(usage)?);

                return Ok(AgentResponse {
                    content: response.message.content,
                    metadata: Some(metadata),
                });
            }

            let calls = response.message.tool_calls.clone();
            messages.push(response.message);

            for call in &calls {
                debug!(iteration, tool = %call.name, "Executing tool call");
                let output = agent.call_tool(call).await;
                messages.push(Message::tool(&call.id, &call.name, output));
                tool_calls += 1;
            }
        }

        Err(ScanError::Agent(format!(
            "No final answer after {} iterations",
            self.max_iterations
        )))
    }
}
