//! SQLite task store and configuration tests on an on-disk database

mod common;

use common::setup_test_db;
use scan_agent::config::{self, ScanConfig};
use scan_agent::persistence::{Database, SqliteConfigurationProvider, SqliteTaskRepository};
use scan_agent::secrets::AesGcmEncryptionService;
use scan_agent::testing::{fixtures, StaticSecretsProvider};
use scan_agent::{ConfigurationProvider, ScanError, TaskRepository, TaskStatus};
use serde_json::{json, Map};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_task_survives_reconnect() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("tasks.db");

    {
        let db = Database::new(&path).await.unwrap();
        db.run_migrations().await.unwrap();
        let repo = SqliteTaskRepository::new(Arc::new(db.clone()));
        repo.create_task(&fixtures::bitbucket_task("bb-1").with_hint_id("hint-7"))
            .await
            .unwrap();
        db.close().await;
    }

    let db = Database::new(&path).await.unwrap();
    db.run_migrations().await.unwrap();
    let repo = SqliteTaskRepository::new(Arc::new(db));

    let task = repo.get_task("bb-1").await.unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.hint_id.as_deref(), Some("hint-7"));
    assert_eq!(task.repository_url().unwrap(), "https://bitbucket.org/team/api");
}

#[tokio::test]
async fn test_update_keeps_created_at_and_advances_updated_at() {
    let (_dir, db) = setup_test_db().await;
    let repo = SqliteTaskRepository::new(db);
    let created = repo.create_task(&fixtures::github_task("t1")).await.unwrap();

    let mut task = created.clone();
    task.mark_in_progress();
    let in_progress = repo.update_task(&task).await.unwrap();

    let mut task = in_progress.clone();
    let mut result = Map::new();
    result.insert("status".to_string(), json!("COMPLETED"));
    task.mark_completed(result, 12);
    let completed = repo.update_task(&task).await.unwrap();

    assert_eq!(completed.created_at, created.created_at);
    assert!(in_progress.updated_at > created.updated_at);
    assert!(completed.updated_at > in_progress.updated_at);
    assert_eq!(completed.scaned_files, 12);
    assert_eq!(completed.result["status"], json!("COMPLETED"));
}

#[tokio::test]
async fn test_update_inserts_unknown_task() {
    let (_dir, db) = setup_test_db().await;
    let repo = SqliteTaskRepository::new(db);

    let stored = repo.update_task(&fixtures::cli_task("fresh")).await.unwrap();

    assert_eq!(stored.id, "fresh");
    assert_eq!(stored.args["batch_id"], json!("b-1"));
}

#[tokio::test]
async fn test_create_rejects_duplicate_id() {
    let (_dir, db) = setup_test_db().await;
    let repo = SqliteTaskRepository::new(db);
    repo.create_task(&fixtures::cli_task("dup")).await.unwrap();

    let err = repo.create_task(&fixtures::cli_task("dup")).await.unwrap_err();
    assert!(err.is_storage());
}

#[tokio::test]
async fn test_list_most_recent_first() {
    let (_dir, db) = setup_test_db().await;
    let repo = SqliteTaskRepository::new(db);
    repo.create_task(&fixtures::cli_task("old")).await.unwrap();
    repo.create_task(&fixtures::cli_task("new")).await.unwrap();

    let mut old = repo.get_task("old").await.unwrap();
    old.mark_error();
    repo.update_task(&old).await.unwrap();

    let tasks = repo.list_tasks(10).await.unwrap();
    assert_eq!(tasks[0].id, "old");
    assert_eq!(repo.list_tasks(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_scan_config_from_encrypted_store() {
    let (_dir, db) = setup_test_db().await;
    let encryption = Arc::new(AesGcmEncryptionService::new(Arc::new(
        StaticSecretsProvider::random(),
    )));
    let provider = SqliteConfigurationProvider::new(db, encryption);

    provider.set_value(config::MCP_SERVER_URL, "http://mcp:3000/mcp").await.unwrap();
    provider.set_value(config::SCAN_SYSTEM_PROMPT, "Audit the code.").await.unwrap();
    provider
        .set_value(config::CONTENT_TEMPLATE, "Scan {repository_url} at {commit_hash}")
        .await
        .unwrap();
    provider.set_value(config::IA_PROVIDER, "gemini").await.unwrap();
    provider.set_value(config::IA_MODEL, "gemini-1.5-pro").await.unwrap();
    provider.set_secret(config::IA_API_KEY, "AIza-secret").await.unwrap();

    let scan = ScanConfig::load(&provider).await.unwrap();
    assert_eq!(scan.provider, llm::Provider::Google);
    assert_eq!(scan.api_key, "AIza-secret");

    // Stored ciphertext is not the plain value.
    let raw = provider.get_value(config::IA_API_KEY).await.unwrap();
    assert_ne!(raw, "AIza-secret");
}

#[tokio::test]
async fn test_secret_with_wrong_key_fails() {
    let (_dir, db) = setup_test_db().await;
    let writer = SqliteConfigurationProvider::new(
        db.clone(),
        Arc::new(AesGcmEncryptionService::new(Arc::new(StaticSecretsProvider::random()))),
    );
    writer.set_secret(config::IA_API_KEY, "sk-live").await.unwrap();

    let reader = SqliteConfigurationProvider::new(
        db,
        Arc::new(AesGcmEncryptionService::new(Arc::new(StaticSecretsProvider::random()))),
    );
    let err = reader.get_secret(config::IA_API_KEY).await.unwrap_err();
    assert!(matches!(err, ScanError::Encryption(_)));
}
