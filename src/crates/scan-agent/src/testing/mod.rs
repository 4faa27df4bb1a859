//! Test infrastructure and helpers for the scan agent
//!
//! In-memory implementations of the ports plus scripted agent, model and
//! tool doubles, used by unit and integration tests.

use crate::agent::{Agent, AgentMessage, AgentResponse};
use crate::domain::Task;
use crate::error::{Result, ScanError};
use crate::ports::{ConfigurationProvider, SecretsProvider, TaskRepository};
use crate::tools::Tool;
use async_trait::async_trait;
use llm::{ChatModel, ChatRequest, ChatResponse, LlmError, Message, UsageMetadata};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Task store kept in memory, counting writes.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: Mutex<HashMap<String, Task>>,
    writes: AtomicUsize,
    fail_writes: bool,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let repo = Self::new();
        {
            let mut map = lock(&repo.tasks);
            for task in tasks {
                map.insert(task.id.clone(), task);
            }
        }
        repo
    }

    /// A store whose writes always fail.
    pub fn failing_writes(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            fail_writes: true,
            ..Self::with_tasks(tasks)
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn stored(&self, id: &str) -> Option<Task> {
        lock(&self.tasks).get(id).cloned()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn get_task(&self, id: &str) -> Result<Task> {
        self.stored(id)
            .ok_or_else(|| ScanError::NotFound(format!("Task not found: {}", id)))
    }

    async fn update_task(&self, task: &Task) -> Result<Task> {
        if self.fail_writes {
            return Err(ScanError::Database("write rejected".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        lock(&self.tasks).insert(task.id.clone(), task.clone());
        Ok(task.clone())
    }
}

/// Agent double that records prompts and replays scripted outcomes.
pub struct FakeAgent {
    responses: Mutex<VecDeque<Result<AgentResponse>>>,
    prompts: Mutex<Vec<AgentMessage>>,
    temperatures: Mutex<Vec<f32>>,
}

impl FakeAgent {
    pub fn new(outcomes: Vec<Result<AgentResponse>>) -> Self {
        Self {
            responses: Mutex::new(outcomes.into()),
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        }
    }

    /// Agent that answers each call with the given text, in order.
    pub fn replying(contents: &[&str]) -> Self {
        Self::new(
            contents
                .iter()
                .map(|c| {
                    Ok(AgentResponse {
                        content: c.to_string(),
                        metadata: None,
                    })
                })
                .collect(),
        )
    }

    pub fn failing(error: ScanError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn prompts(&self) -> Vec<AgentMessage> {
        lock(&self.prompts).clone()
    }

    pub fn temperatures(&self) -> Vec<f32> {
        lock(&self.temperatures).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

#[async_trait]
impl Agent for FakeAgent {
    async fn invoke(&self, message: &AgentMessage, temperature: f32) -> Result<AgentResponse> {
        lock(&self.prompts).push(message.clone());
        lock(&self.temperatures).push(temperature);
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Err(ScanError::Agent("no scripted response left".to_string())))
    }
}

/// Chat model double that replays assistant messages and records requests.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> llm::Result<ChatResponse> {
        lock(&self.requests).push(request);
        let message = lock(&self.replies)
            .pop_front()
            .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))?;

        Ok(ChatResponse {
            message,
            usage: Some(UsageMetadata::new(10, 5)),
            metadata: HashMap::new(),
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Tool returning a fixed output, or a fixed error.
pub struct StaticTool {
    name: String,
    output: std::result::Result<Value, String>,
    calls: AtomicUsize,
}

impl StaticTool {
    pub fn new(name: impl Into<String>, output: Value) -> Self {
        Self {
            name: name.into(),
            output: Ok(output),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Static test tool"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone().map_err(ScanError::Tool)
    }
}

/// Configuration provider over fixed maps. Secrets are stored in clear.
#[derive(Default)]
pub struct InMemoryConfigurationProvider {
    values: HashMap<String, String>,
    secrets: HashMap<String, String>,
}

impl InMemoryConfigurationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_secret(mut self, name: &str, value: &str) -> Self {
        self.secrets.insert(name.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl ConfigurationProvider for InMemoryConfigurationProvider {
    async fn get_value(&self, name: &str) -> Result<String> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| ScanError::NotFound(format!("Configuration parameter not found: {}", name)))
    }

    async fn get_secret(&self, name: &str) -> Result<Option<String>> {
        Ok(self.secrets.get(name).cloned())
    }
}

/// Secrets provider returning fixed key material.
#[derive(Debug, Clone)]
pub struct StaticSecretsProvider {
    key: Option<String>,
}

impl StaticSecretsProvider {
    pub fn new(key: Option<String>) -> Self {
        Self { key }
    }

    /// Provider holding a freshly generated AES-256 key.
    pub fn random() -> Self {
        Self::new(Some(crate::secrets::AesGcmEncryptionService::generate_key()))
    }
}

#[async_trait]
impl SecretsProvider for StaticSecretsProvider {
    async fn get_secret(&self) -> Result<Option<String>> {
        Ok(self.key.clone())
    }
}

/// Test fixtures for common scan scenarios
pub mod fixtures {
    use crate::domain::{Task, TaskSource};
    use serde_json::{json, Map, Value};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// GitHub task for `org/repo` at `abc123`.
    pub fn github_task(id: &str) -> Task {
        Task::with_id(
            id,
            TaskSource::Github,
            object(json!({
                "github_repo_name": "org/repo",
                "github_commit_sha": "abc123",
                "github_assignee": "octocat"
            })),
        )
    }

    /// Bitbucket task for `team/api` at `f00d`.
    pub fn bitbucket_task(id: &str) -> Task {
        Task::with_id(
            id,
            TaskSource::Bitbucket,
            object(json!({
                "bitbucket_workspace": "team",
                "bitbucket_repo_slug": "api",
                "bitbucket_commit": "f00d"
            })),
        )
    }

    /// CLI task with explicit URL and commit.
    pub fn cli_task(id: &str) -> Task {
        Task::with_id(
            id,
            TaskSource::Cli,
            object(json!({
                "repository_url": "https://git.example.com/repo.git",
                "commit_hash": "deadbeef",
                "batch_id": "b-1"
            })),
        )
    }

    /// GitHub task lacking its commit argument.
    pub fn github_task_without_commit(id: &str) -> Task {
        Task::with_id(
            id,
            TaskSource::Github,
            object(json!({"github_repo_name": "org/repo"})),
        )
    }

    pub const TEMPLATE: &str =
        "Analyse the repository {repository_url} at commit {commit_hash}.\nContext:\n{args}";
}
