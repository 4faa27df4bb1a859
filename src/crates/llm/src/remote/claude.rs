//! Anthropic Claude client implementation.
//!
//! Uses the Messages API with tool use. System messages are lifted into the
//! top-level `system` field and tool results travel as `tool_result` blocks
//! inside user turns.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::ClaudeClient;
//! use llm::{ChatModel, ChatRequest, Message, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::from_env(
//!     "ANTHROPIC_API_KEY",
//!     "https://api.anthropic.com",
//!     "claude-3-5-sonnet-latest"
//! )?;
//! let client = ClaudeClient::new(config)?;
//!
//! let request = ChatRequest::new(vec![Message::user("Hello!")]);
//! let response = client.chat(request).await?;
//! ```

use super::{build_http_client, read_json};
use crate::chat::{ChatModel, ChatRequest, ChatResponse, UsageMetadata};
use crate::config::RemoteLlmConfig;
use crate::error::Result;
use crate::messages::{Message, MessageRole, ToolCall};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl ClaudeClient {
    /// Create a new Claude client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = build_http_client(&config)?;
        Ok(Self { config, client })
    }

    /// Convert conversation messages to Claude turns, skipping system messages.
    ///
    /// Consecutive tool results are merged into a single user turn.
    fn convert_messages(&self, messages: &[Message]) -> Vec<ClaudeMessage> {
        let mut claude_messages: Vec<ClaudeMessage> = Vec::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => {}
                MessageRole::User => claude_messages.push(ClaudeMessage {
                    role: "user".to_string(),
                    content: vec![ClaudeBlock::Text {
                        text: msg.content.clone(),
                    }],
                }),
                MessageRole::Assistant => {
                    let mut content = Vec::new();
                    if !msg.content.is_empty() {
                        content.push(ClaudeBlock::Text {
                            text: msg.content.clone(),
                        });
                    }
                    for call in &msg.tool_calls {
                        content.push(ClaudeBlock::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input: call.arguments.clone(),
                        });
                    }
                    claude_messages.push(ClaudeMessage {
                        role: "assistant".to_string(),
                        content,
                    });
                }
                MessageRole::Tool => {
                    let block = ClaudeBlock::ToolResult {
                        tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                        content: msg.content.clone(),
                    };
                    match claude_messages.last_mut() {
                        Some(last)
                            if last.role == "user"
                                && last
                                    .content
                                    .iter()
                                    .all(|b| matches!(b, ClaudeBlock::ToolResult { .. })) =>
                        {
                            last.content.push(block)
                        }
                        _ => claude_messages.push(ClaudeMessage {
                            role: "user".to_string(),
                            content: vec![block],
                        }),
                    }
                }
            }
        }

        claude_messages
    }

    fn convert_response(&self, claude_resp: ClaudeResponse) -> ChatResponse {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in claude_resp.content {
            match block {
                ClaudeBlock::Text { text: t } => text.push_str(&t),
                ClaudeBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input,
                }),
                ClaudeBlock::ToolResult { .. } => {}
            }
        }

        let usage = Some(UsageMetadata::new(
            claude_resp.usage.input_tokens,
            claude_resp.usage.output_tokens,
        ));

        let mut metadata = HashMap::new();
        metadata.insert("model".to_string(), Value::String(claude_resp.model));
        metadata.insert(
            "stop_reason".to_string(),
            Value::String(claude_resp.stop_reason.unwrap_or_default()),
        );

        ChatResponse {
            message: Message::assistant_with_tools(text, tool_calls),
            usage,
            metadata,
        }
    }
}

#[async_trait]
impl ChatModel for ClaudeClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = self.config.endpoint("v1/messages");

        let req_body = ClaudeRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(&request.messages),
            system: request.system_text(),
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(
                    request
                        .tools
                        .iter()
                        .map(|t| ClaudeTool {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            input_schema: t.parameters.clone(),
                        })
                        .collect(),
                )
            },
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: request.temperature,
            stream: false,
        };

        tracing::debug!(model = %self.config.model, "Claude chat request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&req_body)
            .send()
            .await?;

        let claude_resp: ClaudeResponse = read_json("Claude", response).await?;
        Ok(self.convert_response(claude_resp))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Claude API types
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ClaudeTool>>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ClaudeTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: Vec<ClaudeBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ClaudeClient {
        ClaudeClient::new(RemoteLlmConfig::new(
            "test-key",
            "https://api.anthropic.com",
            "claude-3-5-sonnet-latest",
        ))
        .unwrap()
    }

    #[test]
    fn test_system_messages_are_not_turns() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let claude_msgs = client().convert_messages(&messages);

        assert_eq!(claude_msgs.len(), 1);
        assert_eq!(claude_msgs[0].role, "user");
    }

    #[test]
    fn test_consecutive_tool_results_share_a_turn() {
        let messages = vec![
            Message::user("scan"),
            Message::assistant_with_tools(
                "",
                vec![
                    ToolCall { id: "t1".into(), name: "a".into(), arguments: json!({}) },
                    ToolCall { id: "t2".into(), name: "b".into(), arguments: json!({}) },
                ],
            ),
            Message::tool("t1", "a", "one"),
            Message::tool("t2", "b", "two"),
        ];
        let claude_msgs = client().convert_messages(&messages);

        assert_eq!(claude_msgs.len(), 3);
        assert_eq!(claude_msgs[1].content.len(), 2);
        assert_eq!(claude_msgs[2].role, "user");
        assert_eq!(claude_msgs[2].content.len(), 2);

        let encoded = serde_json::to_value(&claude_msgs[2]).unwrap();
        assert_eq!(encoded["content"][0]["type"], "tool_result");
        assert_eq!(encoded["content"][1]["tool_use_id"], "t2");
    }

    #[test]
    fn test_response_with_tool_use() {
        let raw = json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-latest",
            "content": [
                {"type": "text", "text": "Looking."},
                {"type": "tool_use", "id": "toolu_1", "name": "grep", "input": {"pattern": "eval"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 20, "output_tokens": 7}
        });
        let resp: ClaudeResponse = serde_json::from_value(raw).unwrap();
        let chat = client().convert_response(resp);

        assert_eq!(chat.message.content, "Looking.");
        assert_eq!(chat.message.tool_calls[0].name, "grep");
        assert_eq!(chat.metadata["stop_reason"], "tool_use");
    }
}
