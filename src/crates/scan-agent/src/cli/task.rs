//! Task command handlers

use crate::domain::{Task, TaskSource, TaskStatus};
use crate::error::{Result, ScanError};
use crate::persistence::{Database, SqliteTaskRepository};
use crate::ports::TaskRepository;
use colored::Colorize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Parse `key=value` pairs into task arguments.
///
/// Values that parse as JSON are stored as such, anything else as a string.
pub fn parse_args(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut args = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .filter(|(k, _)| !k.trim().is_empty())
            .ok_or_else(|| ScanError::Config(format!("Expected key=value, got '{}'", pair)))?;
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        args.insert(key.trim().to_string(), value);
    }
    Ok(args)
}

/// Handle task create command
pub async fn handle_create(
    db: Arc<Database>,
    source: &str,
    pairs: &[String],
    hint_id: Option<String>,
) -> Result<Task> {
    let mut task = Task::new(TaskSource::from(source), parse_args(pairs)?);
    if let Some(hint_id) = hint_id {
        task = task.with_hint_id(hint_id);
    }

    let repo = SqliteTaskRepository::new(db);
    let task = repo.create_task(&task).await?;
    info!(task_id = %task.id, source = %task.source, "Task created");

    println!("{}", "✓ Task created successfully".green().bold());
    println!("  ID: {}", task.id);
    println!("  Source: {}", task.source);
    println!("  Status: {}", task.status);

    Ok(task)
}

/// Handle task show command
pub async fn handle_show(db: Arc<Database>, id: &str) -> Result<Task> {
    let repo = SqliteTaskRepository::new(db);
    let task = repo.get_task(id).await?;

    println!("Task: {}", task.id.bold());
    println!("  Status: {}", colorize_status(task.status));
    println!("  Source: {}", task.source);
    match task.identity() {
        Ok(identity) => {
            println!("  Repository: {}", identity.repository_url);
            println!("  Commit: {}", identity.commit_hash);
        }
        Err(e) => println!("  Repository: {}", e.to_string().yellow()),
    }
    if let Some(hint_id) = &task.hint_id {
        println!("  Hint: {}", hint_id);
    }
    println!("  Scanned files: {}", task.scaned_files);
    if let Some(updated) = task.updated_at_utc() {
        println!("  Updated: {}", updated.to_rfc3339());
    }
    if !task.result.is_empty() {
        println!("  Result:");
        println!("{}", serde_json::to_string_pretty(&task.result)?);
    }

    Ok(task)
}

/// Handle task list command
pub async fn handle_list(db: Arc<Database>, limit: u32) -> Result<()> {
    let repo = SqliteTaskRepository::new(db);
    let tasks = repo.list_tasks(limit).await?;

    if tasks.is_empty() {
        println!("{}", "No tasks found".yellow());
        return Ok(());
    }

    println!("{:<38} {:<12} {:<10} {:>6}", "ID", "Status", "Source", "Files");
    println!("{}", "-".repeat(69));
    for task in tasks {
        println!(
            "{:<38} {:<12} {:<10} {:>6}",
            task.id,
            task.status.as_str(),
            task.source.as_str(),
            task.scaned_files
        );
    }

    Ok(())
}

pub fn colorize_status(status: TaskStatus) -> colored::ColoredString {
    match status {
        TaskStatus::Completed => status.as_str().green(),
        TaskStatus::Failed => status.as_str().red(),
        TaskStatus::Error => status.as_str().red().bold(),
        TaskStatus::InProgress => status.as_str().cyan(),
        TaskStatus::Pending => status.as_str().normal(),
    }
}
