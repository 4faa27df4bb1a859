//! Configuration parameters stored in the `configuration` table.

use super::db::Database;
use crate::error::{Result, ScanError};
use crate::ports::{ConfigurationProvider, EncryptionService};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;
use tracing::debug;

/// SQLite-backed configuration provider. Secrets are decrypted on read.
#[derive(Clone)]
pub struct SqliteConfigurationProvider {
    db: Arc<Database>,
    encryption: Arc<dyn EncryptionService>,
}

impl SqliteConfigurationProvider {
    pub fn new(db: Arc<Database>, encryption: Arc<dyn EncryptionService>) -> Self {
        Self { db, encryption }
    }

    async fn raw_value(&self, name: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM configuration WHERE parameter_id = ?")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| ScanError::Database(format!("Failed to load parameter {}: {}", name, e)))?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn store(&self, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO configuration (parameter_id, value) VALUES (?, ?)
             ON CONFLICT(parameter_id) DO UPDATE SET value = excluded.value",
        )
        .bind(name)
        .bind(value)
        .execute(self.db.pool())
        .await
        .map_err(|e| ScanError::Database(format!("Failed to store parameter {}: {}", name, e)))?;
        Ok(())
    }

    /// Store a plain value, replacing any previous one.
    pub async fn set_value(&self, name: &str, value: &str) -> Result<()> {
        self.store(name, value).await?;
        debug!(parameter = %name, "Configuration value stored");
        Ok(())
    }

    /// Encrypt and store a secret, replacing any previous one.
    pub async fn set_secret(&self, name: &str, value: &str) -> Result<()> {
        let encrypted = self.encryption.encrypt(value).await?;
        self.store(name, &encrypted).await?;
        debug!(parameter = %name, "Configuration secret stored");
        Ok(())
    }
}

#[async_trait]
impl ConfigurationProvider for SqliteConfigurationProvider {
    async fn get_value(&self, name: &str) -> Result<String> {
        self.raw_value(name)
            .await?
            .ok_or_else(|| ScanError::NotFound(format!("Configuration parameter not found: {}", name)))
    }

    async fn get_secret(&self, name: &str) -> Result<Option<String>> {
        match self.raw_value(name).await? {
            Some(encrypted) => Ok(Some(self.encryption.decrypt(&encrypted).await?)),
            None => Ok(None),
        }
    }
}
