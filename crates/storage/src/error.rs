//! Storage error kinds.

/// Errors raised by [`crate::Storage`] and its transactions.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested key has no value (and is not merely a tombstone).
    #[error("key not found")]
    NotFound,

    /// A read key was mutated by another transaction before commit.
    ///
    /// Callers should retry the whole transaction body, per spec.md's
    /// optimistic-concurrency discipline.
    #[error("transaction conflict, retry")]
    Conflict,

    /// The underlying RocksDB engine reported an error.
    #[error("storage engine error: {0}")]
    Engine(String),

    /// CBOR encoding/decoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::Engine(err.to_string())
    }
}
