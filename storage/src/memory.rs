use std::collections::HashMap;

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::driver::{Driver, Metadata};
use crate::error::StorageError;

#[derive(Debug)]
struct Item {
    created: DateTime<Utc>,
    data: Bytes,
}

impl From<Bytes> for Item {
    fn from(data: Bytes) -> Self {
        Self {
            created: Utc::now(),
            data,
        }
    }
}

impl From<&Item> for Metadata {
    fn from(item: &Item) -> Self {
        Metadata {
            size: item.data.len() as u64,
            created: item.created,
        }
    }
}

/// Storage driver that keeps all values in memory.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    items: RwLock<HashMap<Utf8PathBuf, Item>>,
}

impl MemoryDriver {
    /// Create a new, empty in-memory driver.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, key: &Utf8Path) -> Result<bool, StorageError> {
        Ok(self.items.read().await.contains_key(key))
    }

    async fn metadata(&self, key: &Utf8Path) -> Result<Metadata, StorageError> {
        let items = self.items.read().await;
        items
            .get(key)
            .map(Metadata::from)
            .ok_or_else(|| StorageError::not_found(self.name(), key))
    }

    async fn save(&self, key: &Utf8Path, data: Bytes) -> Result<(), StorageError> {
        let mut items = self.items.write().await;
        items.insert(key.to_owned(), data.into());
        Ok(())
    }

    async fn value(&self, key: &Utf8Path) -> Result<Bytes, StorageError> {
        let items = self.items.read().await;
        items
            .get(key)
            .map(|item| item.data.clone())
            .ok_or_else(|| StorageError::not_found(self.name(), key))
    }

    async fn delete(&self, key: &Utf8Path) -> Result<(), StorageError> {
        let mut items = self.items.write().await;
        items
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(self.name(), key))
    }

    async fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), StorageError> {
        let mut items = self.items.write().await;
        let item = items
            .remove(from)
            .ok_or_else(|| StorageError::not_found(self.name(), from))?;
        items.insert(to.to_owned(), item);
        Ok(())
    }

    async fn list(&self, prefix: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StorageError> {
        tracing::trace!(%prefix, "list memory keys");
        let items = self.items.read().await;
        Ok(items
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
