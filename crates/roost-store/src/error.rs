//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Body or config value serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A different message already occupies this author's depth.
    #[error("conflict at {author} depth {depth}: existing message {existing}")]
    Conflict {
        author: String,
        depth: u64,
        existing: String,
    },

    /// Blob exceeds the size limit.
    #[error("blob is {size} bytes, limit is {limit}")]
    BlobTooLarge { size: usize, limit: usize },

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
