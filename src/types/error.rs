//! Error types for index operations.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use thiserror::Error;

/// Convenient result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error type for all index operations.
///
/// Nothing in the index layer swallows these: every variant reaches the
/// immediate caller, which decides whether to retry or invalidate the index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Storage open/read/write failure (RocksDB)
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] rocksdb::Error),

    /// Stored bytes do not decode to a value or posting list
    #[error("Corrupt encoding: {0}")]
    CorruptEncoding(String),

    /// Online accessor requested before population completed
    #[error("Index {0} not online yet")]
    IndexNotOnline(u64),

    /// Update record with an unknown mode or mismatched values
    #[error("Unsupported update kind: {0}")]
    UnsupportedUpdateKind(String),

    /// Lookup on a reader whose snapshot was already released
    #[error("Index reader already closed")]
    ReaderClosed,

    /// Mutation on an index that was closed or dropped
    #[error("Index {0} is closed")]
    IndexClosed(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IndexError {
    /// Create a corrupt-encoding error with context.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptEncoding(msg.into())
    }

    /// Create an unsupported-update error with context.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedUpdateKind(msg.into())
    }

    /// Check if error is recoverable.
    ///
    /// # Returns
    ///
    /// `true` if the operation can be retried as-is, `false` otherwise
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::IoError(_))
    }
}
