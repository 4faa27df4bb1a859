//! Command handlers for the `scan-agent` binary

pub mod config;
pub mod run;
pub mod task;

use crate::config::Settings;
use crate::error::Result;
use crate::persistence::{Database, SqliteConfigurationProvider};
use crate::ports::EncryptionService;
use crate::secrets::{AesGcmEncryptionService, EnvSecretsProvider};
use std::sync::Arc;

/// Open the configured database and bring its schema up to date.
pub async fn open_database(settings: &Settings) -> Result<Arc<Database>> {
    let db = Database::connect(&settings.database.url).await?;
    db.run_migrations().await?;
    Ok(Arc::new(db))
}

/// Encryption keyed by the environment variable named in the settings.
pub fn encryption_service(settings: &Settings) -> Arc<dyn EncryptionService> {
    let secrets = Arc::new(EnvSecretsProvider::new(&settings.secrets.encryption_key_name));
    Arc::new(AesGcmEncryptionService::new(secrets))
}

pub fn configuration_provider(
    settings: &Settings,
    db: Arc<Database>,
) -> SqliteConfigurationProvider {
    SqliteConfigurationProvider::new(db, encryption_service(settings))
}
