//! Error types for `gantt_server`.

use std::path::PathBuf;

/// Errors that can occur while serving or persisting the Gantt store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The data file could not be parsed as a store document.
    #[error("Invalid data file {}: {source}", path.display())]
    InvalidDataFile {
        /// Path of the data file.
        path: PathBuf,
        /// The underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A request body did not match any accepted shape.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A task was not found.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A link was not found.
    #[error("Link not found: {0}")]
    LinkNotFound(String),

    /// The data file does not exist yet.
    #[error("Data file not found: {}", .0.display())]
    DataFileMissing(PathBuf),

    /// The request did not carry a valid session.
    #[error("Unauthorized")]
    Unauthorized,

    /// Login was attempted without a password hash or cookie secret configured.
    #[error("Auth not configured")]
    AuthNotConfigured,

    /// A configuration value was invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
