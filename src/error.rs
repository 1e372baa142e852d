use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage unavailable for conversation {key}: {reason}")]
    StorageUnavailable { key: String, reason: String },

    #[error("Storage write failed for conversation {key}: {reason}")]
    StorageWriteFailed { key: String, reason: String },

    #[error("Invalid conversation key: {0:?}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image picker error: {0}")]
    Picker(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Self::StorageUnavailable { key, reason } => Self::StorageUnavailable {
                key: key.clone(),
                reason: reason.clone(),
            },
            Self::StorageWriteFailed { key, reason } => Self::StorageWriteFailed {
                key: key.clone(),
                reason: reason.clone(),
            },
            Self::InvalidKey(s) => Self::InvalidKey(s.clone()),
            Self::Config(s) => Self::Config(s.clone()),
            Self::Picker(s) => Self::Picker(s.clone()),
            Self::Internal(s) => Self::Internal(s.clone()),
            // For errors that can't be cloned, convert to string representation
            Self::Database(e) => Self::Internal(format!("Database error: {}", e)),
            Self::Serialization(e) => Self::Internal(format!("Serialization error: {}", e)),
            Self::Yaml(e) => Self::Internal(format!("YAML error: {}", e)),
            Self::Io(e) => Self::Internal(format!("IO error: {}", e)),
        }
    }
}

impl Error {
    pub fn storage_unavailable(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::StorageUnavailable {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn storage_write_failed(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::StorageWriteFailed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn picker(msg: impl Into<String>) -> Self {
        Self::Picker(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for the persistence failures the store degrades through.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable { .. } | Self::StorageWriteFailed { .. }
        )
    }
}
