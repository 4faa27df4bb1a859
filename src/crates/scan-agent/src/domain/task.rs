//! Scan task definitions
//!
//! Defines the Task entity, its lifecycle transitions and the derivation of
//! the repository identity (URL and commit) from source-specific arguments.

use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Task status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Created, waiting for a scan
    Pending,
    /// Scan is running
    InProgress,
    /// Agent reported a completed (or warning) scan
    Completed,
    /// Agent reported a failed scan
    Failed,
    /// The scan could not be carried out
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
        }
    }

    /// No transition is expected out of a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Error)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "ERROR" => Ok(Self::Error),
            other => Err(ScanError::InvalidStatus(other.to_string())),
        }
    }
}

/// Where the scan request came from; selects the identity arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskSource {
    Github,
    Bitbucket,
    Cli,
}

impl TaskSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "GITHUB",
            Self::Bitbucket => "BITBUCKET",
            Self::Cli => "CLI",
        }
    }

    fn identity_rule(&self) -> &'static IdentityRule {
        match self {
            Self::Github => &GITHUB_IDENTITY,
            Self::Bitbucket => &BITBUCKET_IDENTITY,
            Self::Cli => &CLI_IDENTITY,
        }
    }
}

impl std::fmt::Display for TaskSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unknown sources are treated as CLI.
impl From<&str> for TaskSource {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GITHUB" => Self::Github,
            "BITBUCKET" => Self::Bitbucket,
            _ => Self::Cli,
        }
    }
}

/// Which arguments make up a source's repository identity.
struct IdentityRule {
    url_prefix: &'static str,
    /// Joined with `/` after the prefix.
    url_keys: &'static [&'static str],
    commit_key: &'static str,
}

const GITHUB_IDENTITY: IdentityRule = IdentityRule {
    url_prefix: "https://github.com/",
    url_keys: &["github_repo_name"],
    commit_key: "github_commit_sha",
};

const BITBUCKET_IDENTITY: IdentityRule = IdentityRule {
    url_prefix: "https://bitbucket.org/",
    url_keys: &["bitbucket_workspace", "bitbucket_repo_slug"],
    commit_key: "bitbucket_commit",
};

const CLI_IDENTITY: IdentityRule = IdentityRule {
    url_prefix: "",
    url_keys: &["repository_url"],
    commit_key: "commit_hash",
};

/// Repository URL and commit a task scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryIdentity {
    pub repository_url: String,
    pub commit_hash: String,
}

/// A single code-analysis scan request.
///
/// Timestamps are microseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub source: TaskSource,
    pub args: Map<String, Value>,
    pub result: Map<String, Value>,
    pub scaned_files: u64,
    pub hint_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Create a pending task with a generated id.
    pub fn new(source: TaskSource, args: Map<String, Value>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), source, args)
    }

    /// Create a pending task with a specific id.
    pub fn with_id(id: impl Into<String>, source: TaskSource, args: Map<String, Value>) -> Self {
        let now = Utc::now().timestamp_micros();
        Self {
            id: id.into(),
            status: TaskStatus::Pending,
            source,
            args,
            result: Map::new(),
            scaned_files: 0,
            hint_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_hint_id(mut self, hint_id: impl Into<String>) -> Self {
        self.hint_id = Some(hint_id.into());
        self
    }

    /// Argument value as text. Absent and null values are missing.
    fn arg(&self, key: &str) -> Result<String> {
        match self.args.get(key) {
            None | Some(Value::Null) => Err(ScanError::missing_argument(key)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
        }
    }

    pub fn repository_url(&self) -> Result<String> {
        let rule = self.source.identity_rule();
        let parts = rule
            .url_keys
            .iter()
            .map(|key| self.arg(key))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{}{}", rule.url_prefix, parts.join("/")))
    }

    pub fn commit_hash(&self) -> Result<String> {
        self.arg(self.source.identity_rule().commit_key)
    }

    pub fn identity(&self) -> Result<RepositoryIdentity> {
        Ok(RepositoryIdentity {
            repository_url: self.repository_url()?,
            commit_hash: self.commit_hash()?,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.created_at)
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.updated_at)
    }

    /// Advance `updated_at`, strictly, even when the clock has not moved.
    fn touch(&mut self) {
        let now = Utc::now().timestamp_micros();
        self.updated_at = now.max(self.updated_at + 1);
    }

    /// Mark task as in progress. Allowed from any status.
    pub fn mark_in_progress(&mut self) {
        self.status = TaskStatus::InProgress;
        self.touch();
    }

    /// Mark task as completed with the agent result
    pub fn mark_completed(&mut self, result: Map<String, Value>, scaned_files: u64) {
        self.status = TaskStatus::Completed;
        self.result = result;
        self.scaned_files = scaned_files;
        self.touch();
    }

    /// Mark task as failed with the agent result
    pub fn mark_failed(&mut self, result: Map<String, Value>, scaned_files: u64) {
        self.status = TaskStatus::Failed;
        self.result = result;
        self.scaned_files = scaned_files;
        self.touch();
    }

    /// Mark task as errored, keeping any result already stored
    pub fn mark_error(&mut self) {
        self.status = TaskStatus::Error;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_github_identity() {
        let task = Task::new(
            TaskSource::Github,
            args(json!({"github_repo_name": "org/repo", "github_commit_sha": "abc123"})),
        );
        let identity = task.identity().unwrap();
        assert_eq!(identity.repository_url, "https://github.com/org/repo");
        assert_eq!(identity.commit_hash, "abc123");
    }

    #[test]
    fn test_bitbucket_identity() {
        let task = Task::new(
            TaskSource::Bitbucket,
            args(json!({
                "bitbucket_workspace": "team",
                "bitbucket_repo_slug": "api",
                "bitbucket_commit": "f00d"
            })),
        );
        assert_eq!(task.repository_url().unwrap(), "https://bitbucket.org/team/api");
        assert_eq!(task.commit_hash().unwrap(), "f00d");
    }

    #[test]
    fn test_cli_identity_is_verbatim() {
        let task = Task::new(
            TaskSource::Cli,
            args(json!({"repository_url": "file:///tmp/repo", "commit_hash": "HEAD"})),
        );
        assert_eq!(task.repository_url().unwrap(), "file:///tmp/repo");
        assert_eq!(task.commit_hash().unwrap(), "HEAD");
    }

    #[test]
    fn test_missing_argument_names_key() {
        let task = Task::new(
            TaskSource::Bitbucket,
            args(json!({"bitbucket_workspace": "team", "bitbucket_commit": "f00d"})),
        );
        match task.repository_url() {
            Err(ScanError::MissingArgument { key }) => assert_eq!(key, "bitbucket_repo_slug"),
            other => panic!("expected MissingArgument, got {:?}", other),
        }
        // The commit alone is still derivable.
        assert_eq!(task.commit_hash().unwrap(), "f00d");
    }

    #[test]
    fn test_null_argument_is_missing() {
        let task = Task::new(
            TaskSource::Github,
            args(json!({"github_repo_name": "org/repo", "github_commit_sha": null})),
        );
        assert!(matches!(
            task.commit_hash(),
            Err(ScanError::MissingArgument { ref key }) if key == "github_commit_sha"
        ));
    }

    #[test]
    fn test_non_string_argument_uses_json_text() {
        let task = Task::new(
            TaskSource::Cli,
            args(json!({"repository_url": "https://example.com/r", "commit_hash": 42})),
        );
        assert_eq!(task.commit_hash().unwrap(), "42");
    }

    #[test]
    fn test_unknown_source_falls_back_to_cli() {
        assert_eq!(TaskSource::from("gitlab"), TaskSource::Cli);
        assert_eq!(TaskSource::from("github"), TaskSource::Github);
    }

    #[test]
    fn test_mark_in_progress_strictly_advances() {
        let mut task = Task::new(TaskSource::Cli, Map::new());
        // Pin the clock ahead so the bump path is exercised.
        task.updated_at = Utc::now().timestamp_micros() + 10_000_000;
        let before = task.updated_at;

        task.mark_in_progress();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.updated_at > before);

        let before = task.updated_at;
        task.mark_in_progress();
        assert!(task.updated_at > before);
    }

    #[test]
    fn test_terminal_transitions() {
        let mut task = Task::new(TaskSource::Cli, Map::new());
        let result = args(json!({"status": "COMPLETED", "scaned_files": 3}));

        task.mark_completed(result.clone(), 3);
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result, result);
        assert_eq!(task.scaned_files, 3);
        assert!(task.is_terminal());

        task.mark_error();
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.result, result, "mark_error keeps the stored result");

        task.mark_failed(Map::new(), 0);
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!(matches!(
            "RUNNING".parse::<TaskStatus>(),
            Err(ScanError::InvalidStatus(s)) if s == "RUNNING"
        ));
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            json!("IN_PROGRESS")
        );
    }
}
