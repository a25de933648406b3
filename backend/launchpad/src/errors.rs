//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchpadError {
    /// Bad input or a project in the wrong state / outside its window.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The external transfer did not confirm. Nothing was persisted.
    #[error("{0}")]
    Transaction(String),

    #[error("{0}")]
    Conflict(String),

    /// The caller's deadline expired before the transfer was submitted.
    #[error("operation timed out before submission")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A detached settlement task panicked or was aborted.
    #[error("Task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl LaunchpadError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, LaunchpadError>;
