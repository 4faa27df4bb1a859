//! Settings loader
//!
//! Reads an optional TOML file. A missing file yields the defaults; a file
//! that exists but does not parse is an error.

use super::schema::Settings;
use crate::error::{Result, ScanError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "scan-agent.toml";

pub struct SettingsLoader {
    path: PathBuf,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_FILE)
    }
}

impl SettingsLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Settings> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!(path = %self.path.display(), "Settings file not found, using defaults");
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| ScanError::Config(format!("Failed to read settings: {}", e)))?;

        let settings: Settings = toml::from_str(&content)
            .map_err(|e| ScanError::Config(format!("Failed to parse settings: {}", e)))?;

        debug!(path = %self.path.display(), "Loaded settings");
        Ok(settings)
    }
}
