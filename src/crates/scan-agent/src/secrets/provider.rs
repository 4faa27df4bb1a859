//! Secret store backed by process environment variables.

use crate::error::Result;
use crate::ports::SecretsProvider;
use async_trait::async_trait;

/// Reads the encryption key material from the environment variable `key_name`.
#[derive(Debug, Clone)]
pub struct EnvSecretsProvider {
    key_name: String,
}

impl EnvSecretsProvider {
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
        }
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }
}

#[async_trait]
impl SecretsProvider for EnvSecretsProvider {
    async fn get_secret(&self) -> Result<Option<String>> {
        Ok(std::env::var(&self.key_name)
            .ok()
            .filter(|value| !value.trim().is_empty()))
    }
}
