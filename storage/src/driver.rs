use std::fmt;

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// Metadata for a stored value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Metadata {
    /// Value size in bytes.
    pub size: u64,

    /// Creation timestamp.
    pub created: DateTime<Utc>,
}

/// A key-value storage driver.
///
/// Keys are `/`-separated UTF-8 paths; a key is also an implicit prefix for
/// [`list`][Driver::list]. Writes to the same key are last-writer-wins, which
/// makes digest-addressed writes idempotent for the stores built on top.
#[async_trait::async_trait]
pub trait Driver: fmt::Debug {
    /// The name of the driver.
    fn name(&self) -> &'static str;

    /// Check whether a key exists.
    async fn exists(&self, key: &Utf8Path) -> Result<bool, StorageError>;

    /// Get the metadata for a key.
    async fn metadata(&self, key: &Utf8Path) -> Result<Metadata, StorageError>;

    /// Store a value under a key, replacing any previous value.
    async fn save(&self, key: &Utf8Path, data: Bytes) -> Result<(), StorageError>;

    /// Load the value stored under a key.
    async fn value(&self, key: &Utf8Path) -> Result<Bytes, StorageError>;

    /// Delete a key. Deleting an absent key is an error.
    async fn delete(&self, key: &Utf8Path) -> Result<(), StorageError>;

    /// Move a value from one key to another, replacing the destination.
    async fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), StorageError>;

    /// List all keys starting with the given prefix.
    async fn list(&self, prefix: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StorageError>;
}

#[async_trait::async_trait]
impl<D> Driver for std::sync::Arc<D>
where
    D: ?Sized + Driver + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }

    async fn exists(&self, key: &Utf8Path) -> Result<bool, StorageError> {
        self.as_ref().exists(key).await
    }

    async fn metadata(&self, key: &Utf8Path) -> Result<Metadata, StorageError> {
        self.as_ref().metadata(key).await
    }

    async fn save(&self, key: &Utf8Path, data: Bytes) -> Result<(), StorageError> {
        self.as_ref().save(key, data).await
    }

    async fn value(&self, key: &Utf8Path) -> Result<Bytes, StorageError> {
        self.as_ref().value(key).await
    }

    async fn delete(&self, key: &Utf8Path) -> Result<(), StorageError> {
        self.as_ref().delete(key).await
    }

    async fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), StorageError> {
        self.as_ref().rename(from, to).await
    }

    async fn list(&self, prefix: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StorageError> {
        self.as_ref().list(prefix).await
    }
}
