//! # Key-value storage backends
//!
//! Abstract storage used by the registry stores: values are addressed by
//! `/`-separated UTF-8 keys, and a key prefix doubles as a listing scope.
//! [`Storage`] is a cheaply clonable handle over a [`Driver`]
//! implementation; [`MemoryDriver`] and [`LocalDriver`] are provided.

use std::sync::Arc;

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};

mod driver;
mod error;
mod local;
mod memory;

pub use driver::{Driver, Metadata};
pub use error::{StorageError, StorageErrorKind};
pub use local::LocalDriver;
pub use memory::MemoryDriver;

pub(crate) type ArcDriver = Arc<dyn Driver + Send + Sync>;

/// Shared handle over a storage [`Driver`].
#[derive(Debug, Clone)]
pub struct Storage {
    driver: ArcDriver,
}

impl<D> From<D> for Storage
where
    D: Driver + Send + Sync + 'static,
{
    fn from(driver: D) -> Self {
        Storage::new(driver)
    }
}

impl Storage {
    /// Wrap a driver into a shared storage handle.
    pub fn new<D: Driver + Send + Sync + 'static>(driver: D) -> Self {
        Self {
            driver: Arc::new(driver),
        }
    }

    /// The name of the underlying driver.
    pub fn name(&self) -> &'static str {
        self.driver.name()
    }

    /// Check whether a key exists.
    #[tracing::instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn exists(&self, key: &Utf8Path) -> Result<bool, StorageError> {
        self.driver.exists(key).await
    }

    /// Get the metadata for a key.
    #[tracing::instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn metadata(&self, key: &Utf8Path) -> Result<Metadata, StorageError> {
        self.driver.metadata(key).await
    }

    /// Store a value under a key, replacing any previous value.
    #[tracing::instrument(skip(self, data), fields(driver = self.driver.name(), len = data.len()))]
    pub async fn save(&self, key: &Utf8Path, data: Bytes) -> Result<(), StorageError> {
        tracing::trace!(%key, "saving value");
        self.driver.save(key, data).await
    }

    /// Load the value stored under a key.
    #[tracing::instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn value(&self, key: &Utf8Path) -> Result<Bytes, StorageError> {
        self.driver.value(key).await
    }

    /// Delete a key.
    #[tracing::instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn delete(&self, key: &Utf8Path) -> Result<(), StorageError> {
        self.driver.delete(key).await
    }

    /// Move a value from one key to another, replacing the destination.
    #[tracing::instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), StorageError> {
        self.driver.rename(from, to).await
    }

    /// List all keys starting with the given prefix.
    #[tracing::instrument(skip(self), fields(driver = self.driver.name()))]
    pub async fn list(&self, prefix: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StorageError> {
        self.driver.list(prefix).await
    }
}
