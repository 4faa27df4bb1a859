//! Configuration command handlers

use crate::error::{Result, ScanError};
use crate::persistence::SqliteConfigurationProvider;
use crate::ports::ConfigurationProvider;
use colored::Colorize;

/// Handle config set command
pub async fn handle_set(
    provider: &SqliteConfigurationProvider,
    name: &str,
    value: &str,
    secret: bool,
) -> Result<()> {
    if secret {
        provider.set_secret(name, value).await?;
        println!("{} {} (encrypted)", "✓ Stored".green().bold(), name);
    } else {
        provider.set_value(name, value).await?;
        println!("{} {} = {}", "✓ Stored".green().bold(), name, value);
    }
    Ok(())
}

/// Handle config get command. Secrets are only reported as present.
pub async fn handle_get(
    provider: &SqliteConfigurationProvider,
    name: &str,
    secret: bool,
) -> Result<()> {
    if secret {
        match provider.get_secret(name).await? {
            Some(_) => println!("{}: {}", name, "<set>".green()),
            None => {
                return Err(ScanError::NotFound(format!("Secret not configured: {}", name)));
            }
        }
    } else {
        let value = provider.get_value(name).await?;
        println!("{}: {}", name, value);
    }
    Ok(())
}
