/// Structured error types for deadlockctl-core.
///
/// The CLI wraps these in `anyhow` for context; library callers get a
/// matchable enum.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for deadlockctl-core operations
#[derive(Error, Debug)]
pub enum DeadlockError {
    /// Driver-level failure (connect, acquire, or statement execution)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Engine identifier other than `mysql` or `postgres`
    #[error("Unknown database engine '{value}' (expected mysql or postgres)")]
    UnknownEngine { value: String },

    /// Invalid configuration value
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Config file exists but is not valid TOML for this tool
    #[error("Invalid config file {path:?}: {source}")]
    ConfigFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Result type alias for deadlockctl-core operations
pub type Result<T> = std::result::Result<T, DeadlockError>;

impl DeadlockError {
    /// Create an unknown engine error
    pub fn unknown_engine(value: impl Into<String>) -> Self {
        Self::UnknownEngine {
            value: value.into(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a config file parse error
    pub fn config_file(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ConfigFile {
            path: path.into(),
            source,
        }
    }
}
