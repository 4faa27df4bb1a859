//! Database management and migrations
//!
//! SQLite connection pool and embedded schema migrations for the task and
//! configuration tables.

use crate::error::{Result, ScanError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Type alias for the database connection pool
pub type DatabasePool = SqlitePool;

/// Database connection wrapper
#[derive(Clone, Debug)]
pub struct Database {
    pub(crate) pool: Arc<DatabasePool>,
}

impl Database {
    /// Open a database file, creating it and its parent directory if needed.
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let path = database_path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| ScanError::Database("Invalid database path".to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ScanError::Database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        Self::connect(&format!("sqlite:{}", path_str)).await
    }

    /// Connect using a `sqlite:` URL. In-memory databases use a single connection.
    pub async fn connect(database_url: &str) -> Result<Self> {
        debug!(url = %database_url, "Connecting to database");

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| ScanError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| ScanError::Database(format!("Failed to connect to database: {}", e)))?;

        info!(url = %database_url, "Database connection established");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Run the embedded migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(|e| ScanError::Database(format!("Migration failed: {}", e)))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Check that the database answers a trivial query.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| ScanError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database connection closed");
    }
}
