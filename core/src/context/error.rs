//! Error types for context operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors while watching the settings file
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to initialize file watcher")]
    InitWatcher(#[source] notify::Error),

    #[error("failed to watch path {path}")]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("settings path {path} has no parent directory")]
    NoParent { path: PathBuf },
}

/// Errors during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),

    #[error("failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

impl ConfigError {
    pub(crate) fn out_of_range(field: &'static str, value: impl ToString) -> Self {
        ConfigError::OutOfRange {
            field,
            value: value.to_string(),
        }
    }
}

/// A metric query that produced no data this tick
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("accelerator support not enabled at compile time")]
    NotCompiled,

    #[cfg(feature = "nvidia")]
    #[error("NVML query failed")]
    Nvml(#[from] nvml_wrapper::error::NvmlError),

    #[error("metrics query exceeded {budget_ms} ms")]
    Timeout { budget_ms: u64 },

    #[error("previous metrics query still running")]
    Busy,

    #[error("metrics query task failed")]
    Task(#[from] tokio::task::JoinError),
}
