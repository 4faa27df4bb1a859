//! Task repository for database operations

use super::db::Database;
use crate::domain::{Task, TaskSource, TaskStatus};
use crate::error::{Result, ScanError};
use crate::ports::TaskRepository;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;
use tracing::debug;

const TASK_COLUMNS: &str =
    "id, status, source, args, result, scaned_files, hint_id, created_at, updated_at";

/// SQLite-backed task store
#[derive(Clone, Debug)]
pub struct SqliteTaskRepository {
    db: Arc<Database>,
}

impl SqliteTaskRepository {
    /// Create a new task repository
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new task. Fails if the id already exists.
    pub async fn create_task(&self, task: &Task) -> Result<Task> {
        let row = TaskRow::from_task(task)?;

        sqlx::query(
            "INSERT INTO tasks (id, status, source, args, result, scaned_files, hint_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.status)
        .bind(&row.source)
        .bind(&row.args)
        .bind(&row.result)
        .bind(row.scaned_files)
        .bind(&row.hint_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| ScanError::Database(format!("Failed to create task: {}", e)))?;

        debug!(task_id = %task.id, "Task created");
        self.get_task(&task.id).await
    }

    /// List tasks, most recently updated first.
    pub async fn list_tasks(&self, limit: u32) -> Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks ORDER BY updated_at DESC LIMIT ?",
            TASK_COLUMNS
        ))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| ScanError::Database(format!("Failed to list tasks: {}", e)))?;

        rows.iter().map(task_from_row).collect()
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn get_task(&self, id: &str) -> Result<Task> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| ScanError::Database(format!("Failed to load task: {}", e)))?
            .ok_or_else(|| ScanError::NotFound(format!("Task not found: {}", id)))?;

        task_from_row(&row)
    }

    async fn update_task(&self, task: &Task) -> Result<Task> {
        let row = TaskRow::from_task(task)?;

        sqlx::query(
            "INSERT INTO tasks (id, status, source, args, result, scaned_files, hint_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                source = excluded.source,
                args = excluded.args,
                result = excluded.result,
                scaned_files = excluded.scaned_files,
                hint_id = excluded.hint_id,
                updated_at = excluded.updated_at",
        )
        .bind(&row.id)
        .bind(&row.status)
        .bind(&row.source)
        .bind(&row.args)
        .bind(&row.result)
        .bind(row.scaned_files)
        .bind(&row.hint_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| ScanError::Database(format!("Failed to update task: {}", e)))?;

        debug!(task_id = %task.id, status = %task.status, "Task persisted");
        self.get_task(&task.id).await
    }
}

/// Column values of a task as stored.
struct TaskRow {
    id: String,
    status: String,
    source: String,
    args: String,
    result: String,
    scaned_files: i64,
    hint_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TaskRow {
    fn from_task(task: &Task) -> Result<Self> {
        Ok(Self {
            id: task.id.clone(),
            status: task.status.as_str().to_string(),
            source: task.source.as_str().to_string(),
            args: serde_json::to_string(&task.args)?,
            result: serde_json::to_string(&task.result)?,
            scaned_files: i64::try_from(task.scaned_files).map_err(|_| {
                ScanError::Database(format!("scaned_files out of range: {}", task.scaned_files))
            })?,
            hint_id: task.hint_id.clone(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        })
    }
}

fn json_object(raw: &str, column: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(ScanError::Database(format!(
            "Column {} holds non-object JSON: {}",
            column, other
        ))),
    }
}

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let status: String = row.get("status");
    let source: String = row.get("source");
    let args: String = row.get("args");
    let result: String = row.get("result");
    let scaned_files: i64 = row.get("scaned_files");

    let id: String = row.get("id");
    let status: TaskStatus = status.parse().map_err(|_| {
        ScanError::Database(format!("Task {} has unknown status '{}'", id, status))
    })?;
    let scaned_files = u64::try_from(scaned_files).map_err(|_| {
        ScanError::Database(format!(
            "Task {} has out-of-range scaned_files {}",
            id, scaned_files
        ))
    })?;

    Ok(Task {
        id,
        status,
        source: TaskSource::from(source.as_str()),
        args: json_object(&args, "args")?,
        result: json_object(&result, "result")?,
        scaned_files,
        hint_id: row.get("hint_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Arc<Database> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let db = Database {
            pool: Arc::new(pool),
        };
        db.run_migrations().await.unwrap();
        Arc::new(db)
    }

    fn sample_task() -> Task {
        let args = json!({"github_repo_name": "org/repo", "github_commit_sha": "abc123"});
        Task::with_id("task-1", TaskSource::Github, args.as_object().cloned().unwrap())
            .with_hint_id("hint-9")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = SqliteTaskRepository::new(setup_test_db().await);
        let task = sample_task();

        let stored = repo.create_task(&task).await.unwrap();
        assert_eq!(stored, task);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = SqliteTaskRepository::new(setup_test_db().await);
        let err = repo.get_task("nope").await.unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let repo = SqliteTaskRepository::new(setup_test_db().await);
        repo.create_task(&sample_task()).await.unwrap();
        assert!(repo.create_task(&sample_task()).await.is_err());
    }

    #[tokio::test]
    async fn test_update_is_upsert_and_returns_persisted() {
        let repo = SqliteTaskRepository::new(setup_test_db().await);
        let mut task = sample_task();

        // Insert path.
        let stored = repo.update_task(&task).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);

        // Update path.
        let result = json!({"status": "COMPLETED", "scaned_files": 42, "foo": "bar"});
        task.mark_completed(result.as_object().cloned().unwrap(), 42);
        let stored = repo.update_task(&task).await.unwrap();

        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.scaned_files, 42);
        assert_eq!(stored.result["foo"], "bar");
        assert_eq!(stored.updated_at, task.updated_at);
        assert_eq!(stored.hint_id.as_deref(), Some("hint-9"));
    }

    #[tokio::test]
    async fn test_unknown_stored_status_is_rejected() {
        let db = setup_test_db().await;
        let repo = SqliteTaskRepository::new(db.clone());
        repo.create_task(&sample_task()).await.unwrap();

        sqlx::query("UPDATE tasks SET status = 'RUNNING' WHERE id = ?")
            .bind("task-1")
            .execute(db.pool())
            .await
            .unwrap();

        let err = repo.get_task("task-1").await.unwrap_err();
        assert!(matches!(err, ScanError::Database(ref msg) if msg.contains("RUNNING")));
    }

    #[tokio::test]
    async fn test_negative_scaned_files_is_rejected() {
        let db = setup_test_db().await;
        let repo = SqliteTaskRepository::new(db.clone());
        repo.create_task(&sample_task()).await.unwrap();

        sqlx::query("UPDATE tasks SET scaned_files = -1 WHERE id = ?")
            .bind("task-1")
            .execute(db.pool())
            .await
            .unwrap();

        let err = repo.get_task("task-1").await.unwrap_err();
        assert!(matches!(err, ScanError::Database(_)));
    }

    #[tokio::test]
    async fn test_list_orders_by_update() {
        let repo = SqliteTaskRepository::new(setup_test_db().await);
        let first = Task::with_id("a", TaskSource::Cli, Map::new());
        let mut second = Task::with_id("b", TaskSource::Cli, Map::new());
        second.updated_at = first.updated_at + 10;

        repo.create_task(&first).await.unwrap();
        repo.create_task(&second).await.unwrap();

        let tasks = repo.list_tasks(10).await.unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
