//! Port contracts consumed by the use case and the adapters.

use crate::domain::Task;
use crate::error::Result;
use async_trait::async_trait;

/// Persistent store of scan tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Fetch a task. Fails with `NotFound` when absent.
    async fn get_task(&self, id: &str) -> Result<Task>;

    /// Upsert a task and return the persisted value.
    async fn update_task(&self, task: &Task) -> Result<Task>;
}

/// Named configuration values and encrypted secrets.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    /// Plain value. Fails with `NotFound` when absent.
    async fn get_value(&self, name: &str) -> Result<String>;

    /// Decrypted secret, or `None` when absent.
    async fn get_secret(&self, name: &str) -> Result<Option<String>>;
}

/// Source of the encryption key material (base64).
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    async fn get_secret(&self) -> Result<Option<String>>;
}

/// Symmetric encryption of configuration secrets.
#[async_trait]
pub trait EncryptionService: Send + Sync {
    async fn encrypt(&self, value: &str) -> Result<String>;
    async fn decrypt(&self, value: &str) -> Result<String>;
}
