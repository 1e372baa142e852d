use crate::config::LogsConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Validates that a log level string is valid
pub fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

/// Installs the global JSON subscriber. `RUST_LOG` overrides the configured level.
pub fn init(config: &LogsConfig) -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());
    validate_log_level(&log_level)?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("Logging initialized with level: {}", log_level);
    Ok(())
}
