use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

use crate::driver::{Driver, Metadata};
use crate::error::StorageError;

const ENGINE: &str = "local";

/// Storage driver backed by a directory on the local filesystem.
///
/// Keys map directly to paths below the root directory.
#[derive(Debug, Clone)]
pub struct LocalDriver {
    root: Utf8PathBuf,
}

impl LocalDriver {
    /// Create a new driver rooted at the given directory.
    pub fn new<P: Into<Utf8PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &Utf8Path) -> Utf8PathBuf {
        self.root.join(key)
    }

    async fn ensure_parent(&self, path: &Utf8Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::io(ENGINE, "create parent directories", err))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Driver for LocalDriver {
    fn name(&self) -> &'static str {
        ENGINE
    }

    async fn exists(&self, key: &Utf8Path) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.resolve(key))
            .await
            .map_err(|err| StorageError::io(ENGINE, "check file existence", err))?)
    }

    async fn metadata(&self, key: &Utf8Path) -> Result<Metadata, StorageError> {
        let meta = tokio::fs::metadata(self.resolve(key))
            .await
            .map_err(|err| StorageError::io(ENGINE, "read file metadata", err))?;
        let created: DateTime<Utc> = meta
            .created()
            .map(Into::into)
            .unwrap_or_else(|_| Utc::now());
        Ok(Metadata {
            size: meta.len(),
            created,
        })
    }

    #[tracing::instrument(skip(self, data), fields(root = %self.root))]
    async fn save(&self, key: &Utf8Path, data: Bytes) -> Result<(), StorageError> {
        let path = self.resolve(key);
        self.ensure_parent(&path).await?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|err| StorageError::io(ENGINE, "write file", err))
    }

    async fn value(&self, key: &Utf8Path) -> Result<Bytes, StorageError> {
        let data = tokio::fs::read(self.resolve(key))
            .await
            .map_err(|err| StorageError::io(ENGINE, "read file", err))?;
        Ok(Bytes::from(data))
    }

    #[tracing::instrument(skip(self), fields(root = %self.root))]
    async fn delete(&self, key: &Utf8Path) -> Result<(), StorageError> {
        tokio::fs::remove_file(self.resolve(key))
            .await
            .map_err(|err| StorageError::io(ENGINE, "delete file", err))
    }

    async fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), StorageError> {
        let dest = self.resolve(to);
        self.ensure_parent(&dest).await?;
        tokio::fs::rename(self.resolve(from), dest)
            .await
            .map_err(|err| StorageError::io(ENGINE, "rename file", err))
    }

    async fn list(&self, prefix: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StorageError> {
        let start = self.resolve(prefix);
        if !tokio::fs::try_exists(&start)
            .await
            .map_err(|err| StorageError::io(ENGINE, "check directory existence", err))?
        {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|err| StorageError::io(ENGINE, "read directory", err))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|err| StorageError::io(ENGINE, "read directory entry", err))?
            {
                let path = Utf8PathBuf::from_path_buf(entry.path()).map_err(|path| {
                    StorageError::new(
                        ENGINE,
                        crate::StorageErrorKind::Io,
                        format!("non UTF-8 path: {}", path.display()),
                    )
                })?;
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|err| StorageError::io(ENGINE, "read entry file type", err))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(key) = path.strip_prefix(&self.root) {
                    keys.push(key.to_owned());
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> (tempfile::TempDir, LocalDriver) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
        (dir, LocalDriver::new(root))
    }

    #[tokio::test]
    async fn save_value_delete() {
        let (_dir, driver) = driver();
        let key = Utf8Path::new("blobs/sha256/ab/data");

        driver.save(key, Bytes::from_static(b"blob")).await.unwrap();
        assert_eq!(driver.value(key).await.unwrap().as_ref(), b"blob");

        driver.delete(key).await.unwrap();
        assert!(!driver.exists(key).await.unwrap());
    }

    #[tokio::test]
    async fn list_walks_nested_keys() {
        let (_dir, driver) = driver();
        for key in ["a/one", "a/b/two", "c/three"] {
            driver
                .save(Utf8Path::new(key), Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        let mut keys = driver.list(Utf8Path::new("a")).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a/b/two", "a/one"]);
    }

    #[tokio::test]
    async fn list_of_absent_prefix_is_empty() {
        let (_dir, driver) = driver();
        assert!(driver.list(Utf8Path::new("none")).await.unwrap().is_empty());
    }
}
