//! Core error types for focusdesk-core.
//!
//! Errors are grouped by the collaborator that produces them. The timer
//! engine itself never fails once a run has started; these types surface at
//! the edges (storage, configuration, notification) where the driver logs
//! and swallows them.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusdesk-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session persistence errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The driver was built outside of a tokio runtime.
    #[error("No tokio runtime available: {0}")]
    Runtime(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The connection mutex was poisoned by a panicking writer.
    #[error("Database handle poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Errors raised by a [`crate::session::SessionStore`].
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Local database failure
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Transport-level failure talking to the hosted service
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The hosted service answered with a non-success status
    #[error("Service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The service answered but the payload lacked the generated id
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Row targeted by an update does not exist
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Blocking worker panicked or was cancelled
    #[error("Background task failed: {0}")]
    Join(String),

    /// Invalid service URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Duration outside the accepted range
    #[error("Duration {minutes} min is outside {min}..={max}")]
    DurationOutOfRange { minutes: u32, min: u32, max: u32 },
}

/// Notification sink failures. Always logged, never propagated.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Output device unavailable
    #[error("Notification output unavailable: {0}")]
    Unavailable(String),

    /// IO errors while writing to the output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.into())
    }
}

impl From<tokio::task::JoinError> for PersistenceError {
    fn from(err: tokio::task::JoinError) -> Self {
        PersistenceError::Join(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
