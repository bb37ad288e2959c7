//! Storage error types

use thiserror::Error;

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(String),

    #[error("Database encryption error: {0}")]
    Encryption(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Wrong encryption key or database not encrypted")]
    WrongKeyOrNotEncrypted,

    #[error("Database pool exhausted")]
    PoolExhausted,

    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    R2d2(#[from] r2d2::Error),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Whether retrying the same operation later may succeed.
    ///
    /// Covers pool exhaustion, timeouts and SQLite BUSY/LOCKED.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PoolExhausted | Self::Timeout(_) | Self::Connection(_) => true,
            Self::Rusqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }

    /// Errors that make the database unusable until an operator intervenes.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Encryption(_) | Self::Migration(_) | Self::WrongKeyOrNotEncrypted)
    }
}

/// Heuristic used while opening a database: SQLCipher reports a wrong key as a
/// generic "not a database" failure.
pub(crate) fn looks_like_wrong_key(message: &str) -> bool {
    let message = message.to_lowercase();
    [
        "file is not a database",
        "file is encrypted",
        "database disk image is malformed",
        "notadb",
        "authentication failed",
        "unsupported file format",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}
