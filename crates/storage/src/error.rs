// Path: crates/storage/src/error.rs
//! Errors surfaced by the two versioned key-value stores.

use thiserror::Error;

/// A persistence failure. Per the error-handling design, every variant here
/// is `Kind::Transient` at the point it is observed by `nyx-state` or
/// `nyx-history` — the caller decides whether a retry is worthwhile or
/// whether repeated failure should be escalated to `Kind::Fatal`.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The underlying `redb` engine reported a failure.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// A stored value failed to decode.
    #[error("storage codec error: {0}")]
    Codec(String),
}

impl From<redb::Error> for StorageError {
    fn from(e: redb::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(e: redb::DatabaseError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(e: redb::TransactionError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<redb::TableError> for StorageError {
    fn from(e: redb::TableError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(e: redb::StorageError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(e: redb::CommitError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(e: bincode::Error) -> Self {
        StorageError::Codec(e.to_string())
    }
}
