//! Analyse-code use case: runs one scan task through the agent and records
//! the outcome.
//!
//! Failures after the task has been persisted `IN_PROGRESS` demote it to
//! `ERROR` and the demoted task is persisted and returned. Task store
//! failures propagate.

use crate::agent::{Agent, AgentMessage, DEFAULT_TEMPERATURE};
use crate::domain::Task;
use crate::error::{Result, ScanError};
use crate::ports::TaskRepository;
use crate::prompt::PromptTemplate;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Terminal status reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedStatus {
    Completed,
    Failed,
    Warning,
}

impl ReportedStatus {
    fn parse(literal: &str) -> Result<Self> {
        match literal {
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "WARNING" => Ok(Self::Warning),
            other => Err(ScanError::InvalidStatus(other.to_string())),
        }
    }
}

/// Parsed agent answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub status: ReportedStatus,
    pub scaned_files: u64,
    /// The whole answer object, kept verbatim.
    pub result: Map<String, Value>,
}

impl AnalysisOutcome {
    /// Parse the agent's answer. A surrounding markdown code fence is ignored.
    pub fn parse(content: &str) -> Result<Self> {
        let body = strip_code_fence(content.trim());
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ScanError::Parse(format!("Agent answer is not valid JSON: {}", e)))?;
        let Value::Object(result) = value else {
            return Err(ScanError::Parse("Agent answer is not a JSON object".to_string()));
        };

        let status = match result.get("status") {
            Some(Value::String(s)) => ReportedStatus::parse(s)?,
            Some(other) => return Err(ScanError::InvalidStatus(other.to_string())),
            None => return Err(ScanError::InvalidStatus("<missing>".to_string())),
        };

        let scaned_files = match result.get("scaned_files") {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_u64().ok_or_else(|| {
                ScanError::Parse(format!("scaned_files must be a non-negative integer, got {}", value))
            })?,
        };

        Ok(Self {
            status,
            scaned_files,
            result,
        })
    }

    /// Apply the terminal transition this outcome calls for.
    pub fn apply(self, task: &mut Task) {
        match self.status {
            ReportedStatus::Completed | ReportedStatus::Warning => {
                task.mark_completed(self.result, self.scaned_files)
            }
            ReportedStatus::Failed => task.mark_failed(self.result, self.scaned_files),
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string, e.g. "json".
    match rest.find('\n') {
        Some(newline) => rest[newline + 1..].trim(),
        None => rest.trim(),
    }
}

pub struct AnalyseCodeUseCase {
    tasks: Arc<dyn TaskRepository>,
    agent: Arc<dyn Agent>,
    template: PromptTemplate,
}

impl AnalyseCodeUseCase {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        agent: Arc<dyn Agent>,
        template: PromptTemplate,
    ) -> Self {
        Self {
            tasks,
            agent,
            template,
        }
    }

    /// Run the scan for `task_id` and return the persisted task.
    ///
    /// A task already in a terminal status is returned as stored, without
    /// calling the agent or writing.
    pub async fn execute(&self, task_id: &str) -> Result<Task> {
        let mut task = self.tasks.get_task(task_id).await?;
        if task.is_terminal() {
            info!(task_id = %task.id, status = %task.status.as_str(), "Task already finished, skipping");
            return Ok(task);
        }

        task.mark_in_progress();
        let mut task = self.tasks.update_task(&task).await?;
        info!(task_id = %task.id, source = %task.source.as_str(), "Scan started");

        match self.analyse(&task).await {
            Ok(outcome) => {
                info!(
                    task_id = %task.id,
                    status = ?outcome.status,
                    scaned_files = outcome.scaned_files,
                    "Scan finished"
                );
                outcome.apply(&mut task);
            }
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Scan failed, marking task as error");
                task.mark_error();
            }
        }

        self.tasks.update_task(&task).await
    }

    async fn analyse(&self, task: &Task) -> Result<AnalysisOutcome> {
        let prompt = self.template.render(task)?;
        let response = self
            .agent
            .invoke(&AgentMessage::user(prompt), DEFAULT_TEMPERATURE)
            .await?;
        AnalysisOutcome::parse(&response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use crate::testing::{fixtures, FakeAgent, InMemoryTaskRepository};
    use serde_json::json;

    fn use_case(repo: Arc<InMemoryTaskRepository>, agent: Arc<FakeAgent>) -> AnalyseCodeUseCase {
        AnalyseCodeUseCase::new(repo, agent, PromptTemplate::new(fixtures::TEMPLATE))
    }

    #[test]
    fn test_parse_fenced_answer() {
        let outcome =
            AnalysisOutcome::parse("```json\n{\"status\":\"WARNING\",\"scaned_files\":3}\n```").unwrap();
        assert_eq!(outcome.status, ReportedStatus::Warning);
        assert_eq!(outcome.scaned_files, 3);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(AnalysisOutcome::parse("[1,2]"), Err(ScanError::Parse(_))));
        assert!(matches!(AnalysisOutcome::parse("looks fine"), Err(ScanError::Parse(_))));
    }

    #[test]
    fn test_parse_status_errors() {
        assert!(matches!(
            AnalysisOutcome::parse(r#"{"status":"DONE"}"#),
            Err(ScanError::InvalidStatus(ref s)) if s == "DONE"
        ));
        assert!(matches!(
            AnalysisOutcome::parse(r#"{"issues":[]}"#),
            Err(ScanError::InvalidStatus(_))
        ));
        assert!(matches!(
            AnalysisOutcome::parse(r#"{"status":"COMPLETED","scaned_files":-1}"#),
            Err(ScanError::Parse(_))
        ));
    }

    #[test]
    fn test_scaned_files_defaults_to_zero() {
        let outcome = AnalysisOutcome::parse(r#"{"status":"FAILED"}"#).unwrap();
        assert_eq!(outcome.scaned_files, 0);
        assert_eq!(outcome.result.len(), 1);
    }

    #[tokio::test]
    async fn test_completed_run_writes_twice() {
        let repo = Arc::new(InMemoryTaskRepository::with_tasks([fixtures::github_task("t1")]));
        let agent = Arc::new(FakeAgent::replying(&[r#"{"status":"COMPLETED","scaned_files":5}"#]));

        let task = use_case(repo.clone(), agent.clone()).execute("t1").await.unwrap();

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.scaned_files, 5);
        assert_eq!(repo.write_count(), 2);
        assert_eq!(agent.temperatures(), vec![DEFAULT_TEMPERATURE]);
        assert_eq!(agent.prompts()[0].role, "user");
    }

    #[tokio::test]
    async fn test_missing_identity_argument_demotes_to_error() {
        let repo = Arc::new(InMemoryTaskRepository::with_tasks([
            fixtures::github_task_without_commit("t1"),
        ]));
        let agent = Arc::new(FakeAgent::replying(&[]));

        let task = use_case(repo.clone(), agent.clone()).execute("t1").await.unwrap();

        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(agent.call_count(), 0);
        assert_eq!(repo.stored("t1").unwrap().status, TaskStatus::Error);
    }

    #[tokio::test]
    async fn test_agent_failure_demotes_to_error() {
        let repo = Arc::new(InMemoryTaskRepository::with_tasks([fixtures::cli_task("t1")]));
        let agent = Arc::new(FakeAgent::failing(ScanError::Agent("model offline".to_string())));

        let task = use_case(repo.clone(), agent).execute("t1").await.unwrap();

        assert_eq!(task.status, TaskStatus::Error);
        assert!(task.result.is_empty());
        assert_eq!(repo.write_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_task_propagates_not_found() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let agent = Arc::new(FakeAgent::replying(&[]));

        let err = use_case(repo.clone(), agent).execute("nope").await.unwrap_err();

        assert!(matches!(err, ScanError::NotFound(_)));
        assert_eq!(repo.write_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let repo = Arc::new(InMemoryTaskRepository::failing_writes([fixtures::github_task("t1")]));
        let agent = Arc::new(FakeAgent::replying(&[r#"{"status":"COMPLETED"}"#]));

        let err = use_case(repo, agent.clone()).execute("t1").await.unwrap_err();

        assert!(err.is_storage());
        assert_eq!(agent.call_count(), 0);
    }

    #[tokio::test]
    async fn test_result_keeps_extra_fields() {
        let repo = Arc::new(InMemoryTaskRepository::with_tasks([fixtures::bitbucket_task("t1")]));
        let agent = Arc::new(FakeAgent::replying(&[
            r#"{"status":"FAILED","scaned_files":2,"issues":[{"severity":"HIGH"}]}"#,
        ]));

        let task = use_case(repo, agent.clone()).execute("t1").await.unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.result["issues"], json!([{"severity": "HIGH"}]));
        assert!(agent.prompts()[0]
            .content
            .contains("https://bitbucket.org/team/api at commit f00d"));
    }
}
