//! Error types for veil-server.

use veil_types::ModeError;

/// Main error type for veil-server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Mode lookup, mode change or ciphertext error.
    #[error(transparent)]
    Mode(#[from] ModeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored row holds a value that is not a known mode or timestamp.
    #[error("corrupt mode record: {value}")]
    CorruptRecord {
        /// The offending stored value.
        value: String,
    },
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
