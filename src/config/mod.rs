mod types;

pub use types::*;

use crate::{Error, Result, logging};
use std::env;
use std::path::Path;
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let mut config = load_from(&config_path).await?;

    if let Ok(db_path) = env::var("CHAT_DB_PATH") {
        debug!("Database path overridden by CHAT_DB_PATH: {}", db_path);
        config.storage.database_path = db_path;
    }

    Ok(config)
}

/// Reads and validates the configuration file at `path`, without environment overrides.
pub async fn load_from(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    debug!("Loading configuration from: {}", path.display());

    let config_str = tokio::fs::read_to_string(path).await?;
    parse(&config_str)
}

/// Parses and validates a YAML configuration document.
pub fn parse(config_str: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.storage.key_prefix.is_empty() {
            return Err(Error::config("storage.key_prefix must not be empty"));
        }
        if self.storage.database_path.is_empty() {
            return Err(Error::config("storage.database_path must not be empty"));
        }
        logging::validate_log_level(&self.logs.level).map_err(|e| Error::config(e.to_string()))?;
        if let Some(contact) = self.contacts.iter().find(|c| c.id.trim().is_empty()) {
            return Err(Error::config(format!(
                "contact {:?} has an empty id",
                contact.name
            )));
        }
        Ok(())
    }
}
