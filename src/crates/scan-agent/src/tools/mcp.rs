//! MCP client over the streamable HTTP transport.
//!
//! JSON-RPC 2.0 requests are POSTed to the server URL. Replies arrive either
//! as `application/json` or as a `text/event-stream` carrying the response
//! in a `data:` event. The session id handed out on `initialize` is echoed on
//! every later request.

use super::Tool;
use crate::agent::AsyncToolsFactory;
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Information about a tool provided by an MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolInfo {
    /// Tool name as provided by the server
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default = "default_schema")]
    pub input_schema: Value,
}

fn default_schema() -> Value {
    json!({"type": "object"})
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn into_result(self, method: &str) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(ScanError::Tool(format!(
                "{} failed: [{}] {}",
                method, error.code, error.message
            )));
        }
        self.result
            .ok_or_else(|| ScanError::Tool(format!("{} returned no result", method)))
    }
}

/// Client for one MCP server session
pub struct McpClient {
    url: String,
    client: reqwest::Client,
    session_id: RwLock<Option<String>>,
    request_id: AtomicU64,
    server_info: Value,
}

impl McpClient {
    /// Connect and perform the initialization handshake:
    /// 1. `initialize` request (captures the session id)
    /// 2. `notifications/initialized` notification
    pub async fn connect(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::Tool(format!("Failed to create HTTP client: {}", e)))?;

        let mut mcp = Self {
            url: url.into(),
            client,
            session_id: RwLock::new(None),
            request_id: AtomicU64::new(1),
            server_info: Value::Null,
        };

        let result = mcp
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "titvo-scan-agent",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await?;

        mcp.server_info = result.get("serverInfo").cloned().unwrap_or(Value::Null);
        mcp.notify("notifications/initialized").await?;

        let protocol = result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(url = %mcp.url, protocol, "MCP session initialized");
        Ok(mcp)
    }

    pub fn server_info(&self) -> &Value {
        &self.server_info
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    /// List all tools, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;

            if let Some(page) = result.get("tools") {
                let page: Vec<McpToolInfo> = serde_json::from_value(page.clone())?;
                tools.extend(page);
            }

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            match &cursor {
                None => break,
                Some(next) if !seen.insert(next.clone()) => {
                    return Err(ScanError::Tool(format!(
                        "MCP server repeated tools/list cursor '{}'",
                        next
                    )));
                }
                Some(_) => {}
            }
        }

        debug!(count = tools.len(), "MCP tools listed");
        Ok(tools)
    }

    /// Call a tool and return its text content joined by newlines.
    ///
    /// A result flagged `isError` becomes a `Tool` error carrying that text.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        let result = self
            .request("tools/call", Some(json!({ "name": name, "arguments": arguments })))
            .await?;

        let text = result
            .get("content")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| result.to_string());

        if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
            return Err(ScanError::Tool(format!("Tool '{}' reported an error: {}", name, text)));
        }
        Ok(text)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        };

        let response = self.post(&body).await?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.write().await = Some(session.to_string());
        }

        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/event-stream"))
            .unwrap_or(false);

        let text = response
            .text()
            .await
            .map_err(|e| ScanError::Tool(format!("Failed to read MCP response: {}", e)))?;

        let reply = if is_sse {
            parse_sse_response(&text, id)?
        } else {
            serde_json::from_str::<JsonRpcResponse>(&text).map_err(|e| {
                ScanError::Tool(format!("Failed to parse JSON-RPC response: {}", e))
            })?
        };

        reply.into_result(method)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        };
        self.post(&body).await?;
        Ok(())
    }

    async fn post(&self, body: &JsonRpcRequest<'_>) -> Result<reqwest::Response> {
        let mut req = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .json(body);

        if let Some(session) = self.session_id.read().await.as_ref() {
            req = req.header(SESSION_HEADER, session);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ScanError::Tool(format!("MCP request {} failed: {}", body.method, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ScanError::Tool(format!(
                "MCP server returned HTTP {} for {}: {}",
                status, body.method, text
            )));
        }
        Ok(response)
    }
}

/// Pick the JSON-RPC response with the given id out of an event stream body.
fn parse_sse_response(body: &str, id: u64) -> Result<JsonRpcResponse> {
    let body = body.replace("\r\n", "\n").replace('\r', "\n");
    for event in body.split("\n\n") {
        let data: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim_start)
            .collect();
        if data.is_empty() {
            continue;
        }

        let Ok(reply) = serde_json::from_str::<JsonRpcResponse>(&data.join("\n")) else {
            continue;
        };
        if reply.id.as_ref().and_then(Value::as_u64) == Some(id) {
            return Ok(reply);
        }
    }

    Err(ScanError::Tool(format!(
        "Event stream carried no response for request {}",
        id
    )))
}

/// A tool served by an MCP server, called under its original name.
pub struct McpTool {
    client: Arc<McpClient>,
    info: McpToolInfo,
}

impl McpTool {
    pub fn new(client: Arc<McpClient>, info: McpToolInfo) -> Self {
        Self { client, info }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn description(&self) -> &str {
        &self.info.description
    }

    fn input_schema(&self) -> Value {
        self.info.input_schema.clone()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let text = self.client.call_tool(&self.info.name, input).await?;
        Ok(Value::String(text))
    }
}

/// Asynchronous tools factory that fetches the tool catalog of an MCP server.
#[derive(Debug, Clone)]
pub struct McpToolsFactory {
    url: String,
    timeout: Duration,
}

impl McpToolsFactory {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AsyncToolsFactory for McpToolsFactory {
    async fn create_tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
        let client = Arc::new(McpClient::connect(&self.url, self.timeout).await?);
        let infos = client.list_tools().await?;
        if infos.is_empty() {
            warn!(url = %self.url, "MCP server offers no tools");
        }

        Ok(infos
            .into_iter()
            .map(|info| Arc::new(McpTool::new(client.clone(), info)) as Arc<dyn Tool>)
            .collect())
    }
}
