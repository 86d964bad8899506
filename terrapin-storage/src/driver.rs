//! Storage driver trait and error types

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur when interacting with a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// Missing or contradictory configuration fields
    #[error("Storage configuration error: {0}")]
    Configuration(String),

    /// No object exists at the expected key
    #[error("Object not found: '{key}'")]
    NotFound { key: String },

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Network or I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a not-found error for a key
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A physical object version: key plus server-observed modification time.
///
/// Keys are relative to the driver's configured prefix. "No object exists"
/// is `None` at every API surface, never a sentinel value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObjectVersion {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Trait for remote object storage drivers
///
/// One implementation per backend. A driver is constructed once per request
/// with authentication already bound in, and must not be shared across
/// concurrent requests.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Whether an object currently exists at the key.
    ///
    /// Absence is `Ok(false)`, never an error.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// The most-recently-modified object under the configured prefix,
    /// or `None` when nothing matches.
    async fn latest_version(&self) -> StorageResult<Option<StorageObjectVersion>>;

    /// Download the object's bytes to a local path.
    ///
    /// Returns the downloaded object's version. Fails with
    /// [`StorageError::NotFound`] if the key is absent at call time, even
    /// when an earlier existence check succeeded.
    async fn download(&self, key: &str, dest: &Path) -> StorageResult<StorageObjectVersion>;

    /// Upload bytes from a local path, returning the resulting version.
    async fn upload(&self, key: &str, src: &Path) -> StorageResult<StorageObjectVersion>;

    /// Delete the object at the key.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}
