//! HTTP mock tests for the remote providers.
//!
//! Uses wiremock to simulate the provider APIs.

use llm::remote::{ClaudeClient, GeminiClient, OpenAiClient};
use llm::{ChatModel, ChatRequest, LlmError, Message, RemoteLlmConfig, ToolDefinition};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, model: &str) -> RemoteLlmConfig {
    RemoteLlmConfig::new("test-api-key", server.uri(), model)
}

fn request_with_tool() -> ChatRequest {
    ChatRequest::new(vec![
        Message::system("You review code."),
        Message::user("Scan the repository"),
    ])
    .with_tools(vec![ToolDefinition {
        name: "list_files".to_string(),
        description: "List repository files".to_string(),
        parameters: json!({"type": "object", "properties": {}}),
    }])
    .with_temperature(0.0)
}

// =============================================================================
// OpenAI
// =============================================================================

#[tokio::test]
async fn test_openai_sends_tools_and_parses_tool_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-api-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "temperature": 0.0,
            "tools": [{"type": "function", "function": {"name": "list_files"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_files", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 30, "completion_tokens": 5, "total_tokens": 35}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(config(&server, "gpt-4o")).unwrap();
    let response = client.chat(request_with_tool()).await.unwrap();

    assert_eq!(response.message.tool_calls.len(), 1);
    assert_eq!(response.message.tool_calls[0].name, "list_files");
    assert_eq!(response.usage.unwrap().total_tokens, 35);
}

#[tokio::test]
async fn test_openai_rate_limit_returns_rate_limit_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(config(&server, "gpt-4o")).unwrap();
    let err = client.chat(request_with_tool()).await.unwrap_err();

    assert!(matches!(err, LlmError::RateLimitExceeded(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_openai_unauthorized_returns_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(config(&server, "gpt-4o")).unwrap();
    let err = client.chat(request_with_tool()).await.unwrap_err();

    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_openai_malformed_body_returns_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(config(&server, "gpt-4o")).unwrap();
    let err = client.chat(request_with_tool()).await.unwrap_err();

    assert!(matches!(err, LlmError::InvalidResponse(_)));
}

// =============================================================================
// Claude
// =============================================================================

#[tokio::test]
async fn test_claude_lifts_system_prompt_and_returns_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-api-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "system": "You review code.",
            "tools": [{"name": "list_files", "input_schema": {"type": "object"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-latest",
            "content": [{"type": "text", "text": "{\"status\": \"COMPLETED\"}"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 40, "output_tokens": 9}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClaudeClient::new(config(&server, "claude-3-5-sonnet-latest")).unwrap();
    let response = client.chat(request_with_tool()).await.unwrap();

    assert_eq!(response.message.content, r#"{"status": "COMPLETED"}"#);
    assert!(response.message.tool_calls.is_empty());
    assert_eq!(response.metadata["stop_reason"], "end_turn");
}

#[tokio::test]
async fn test_claude_server_error_returns_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = ClaudeClient::new(config(&server, "claude-3-5-sonnet-latest")).unwrap();
    let err = client.chat(request_with_tool()).await.unwrap_err();

    match err {
        LlmError::ProviderError(msg) => assert!(msg.contains("503")),
        other => panic!("Expected ProviderError, got {:?}", other),
    }
}

// =============================================================================
// Gemini
// =============================================================================

#[tokio::test]
async fn test_gemini_passes_key_as_query_and_reads_function_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-pro:generateContent"))
        .and(query_param("key", "test-api-key"))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": "You review code."}]},
            "tools": [{"functionDeclarations": [{"name": "list_files"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "list_files", "args": {}}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 11, "candidatesTokenCount": 3, "totalTokenCount": 14}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server, "gemini-1.5-pro")).unwrap();
    let response = client.chat(request_with_tool()).await.unwrap();

    assert_eq!(response.message.tool_calls.len(), 1);
    assert_eq!(response.message.tool_calls[0].name, "list_files");
    assert!(!response.message.tool_calls[0].id.is_empty());
}

#[tokio::test]
async fn test_gemini_forbidden_returns_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server, "gemini-1.5-pro")).unwrap();
    let err = client.chat(request_with_tool()).await.unwrap_err();

    assert!(matches!(err, LlmError::AuthenticationError(_)));
}
