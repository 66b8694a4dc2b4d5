//! Layer (blob) stores

use std::fmt;

use bytes::Bytes;
use storage::Storage;

use crate::blob::{Blob, BlobSource};
use crate::digest::Digest;
use crate::error::RegistryResult;
use crate::layout;
use crate::name::RepoName;

/// Content-addressed blob store scoped to one repository.
///
/// Blob bytes are stored once, globally; each repository that owns a blob
/// holds a layer link for it. Absence is `None`, never an error.
#[async_trait::async_trait]
pub trait Layers: fmt::Debug + Send + Sync {
    /// Admit a blob into this repository, writing its content and link.
    async fn put(&self, source: BlobSource) -> RegistryResult<Blob>;

    /// Look up a blob owned by this repository.
    async fn get(&self, digest: &Digest) -> RegistryResult<Option<Blob>>;

    /// Register a blob from another repository here without copying bytes.
    async fn mount(&self, blob: &Blob) -> RegistryResult<Blob>;
}

/// [`Layers`] backed by a [`Storage`].
#[derive(Debug, Clone)]
pub struct StorageLayers {
    storage: Storage,
    name: RepoName,
}

impl StorageLayers {
    /// Blob store for `name` over the given storage.
    pub fn new(storage: Storage, name: RepoName) -> Self {
        Self { storage, name }
    }
}

#[async_trait::async_trait]
impl Layers for StorageLayers {
    #[tracing::instrument(skip(self, source), fields(repo = %self.name, digest = %source.digest()))]
    async fn put(&self, source: BlobSource) -> RegistryResult<Blob> {
        let (digest, content) = source.admit()?;
        let size = content.len() as u64;
        self.storage
            .save(&layout::blob_data(&digest), content)
            .await?;
        self.storage
            .save(
                &layout::layer_link(&self.name, &digest),
                Bytes::from(digest.to_string()),
            )
            .await?;
        Ok(Blob::stored(self.storage.clone(), digest, Some(size)))
    }

    async fn get(&self, digest: &Digest) -> RegistryResult<Option<Blob>> {
        if !self
            .storage
            .exists(&layout::layer_link(&self.name, digest))
            .await?
        {
            return Ok(None);
        }
        Ok(Some(Blob::stored(
            self.storage.clone(),
            digest.clone(),
            None,
        )))
    }

    #[tracing::instrument(skip(self, blob), fields(repo = %self.name, digest = %blob.digest()))]
    async fn mount(&self, blob: &Blob) -> RegistryResult<Blob> {
        let digest = blob.digest().clone();
        self.storage
            .save(
                &layout::layer_link(&self.name, &digest),
                Bytes::from(digest.to_string()),
            )
            .await?;
        Ok(Blob::stored(self.storage.clone(), digest, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use storage::MemoryDriver;

    fn layers(name: &str) -> (Storage, StorageLayers) {
        let storage = Storage::new(MemoryDriver::new());
        let layers = StorageLayers::new(storage.clone(), name.parse().unwrap());
        (storage, layers)
    }

    #[tokio::test]
    async fn put_and_get_roundtrip() {
        let (_, layers) = layers("test/repo");
        let blob = layers
            .put(BlobSource::trusted(Bytes::from_static(b"layer data")))
            .await
            .unwrap();
        assert_eq!(blob.size().await.unwrap(), 10);

        let found = layers.get(blob.digest()).await.unwrap().unwrap();
        assert_eq!(found.digest(), blob.digest());
        assert_eq!(found.size().await.unwrap(), 10);
        assert_eq!(
            found.content().await.unwrap().bytes().await.unwrap().as_ref(),
            b"layer data"
        );
    }

    #[tokio::test]
    async fn absent_blob_is_none() {
        let (_, layers) = layers("test/repo");
        let absent = layers
            .get(&Digest::new("sha256", "ffff"))
            .await
            .unwrap();
        assert!(absent.is_none());
    }

    #[tokio::test]
    async fn checked_mismatch_writes_nothing() {
        let (storage, layers) = layers("test/repo");
        let digest = Digest::new("sha256", "0000");
        let err = layers
            .put(BlobSource::checked(digest.clone(), Bytes::from_static(b"x")))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DigestMismatch { .. }));
        assert!(!storage
            .exists(&layout::blob_data(&digest))
            .await
            .unwrap());
        assert!(layers.get(&digest).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mount_shares_bytes_across_repositories() {
        let storage = Storage::new(MemoryDriver::new());
        let source = StorageLayers::new(storage.clone(), "one".parse().unwrap());
        let target = StorageLayers::new(storage.clone(), "two".parse().unwrap());

        let blob = source
            .put(BlobSource::trusted(Bytes::from_static(b"shared")))
            .await
            .unwrap();
        assert!(target.get(blob.digest()).await.unwrap().is_none());

        let mounted = target.mount(&blob).await.unwrap();
        assert_eq!(mounted.digest(), blob.digest());
        let found = target.get(blob.digest()).await.unwrap().unwrap();
        assert_eq!(
            found.content().await.unwrap().bytes().await.unwrap().as_ref(),
            b"shared"
        );

        // one copy of the bytes
        let data_keys = storage
            .list(camino::Utf8Path::new("blobs"))
            .await
            .unwrap();
        assert_eq!(data_keys.len(), 1);
    }

    // Store operations run inside spawned request handlers, so their
    // futures must be Send even when a blob is borrowed across an await.
    #[tokio::test]
    async fn mount_runs_on_a_spawned_task() {
        let storage = Storage::new(MemoryDriver::new());
        let source = StorageLayers::new(storage.clone(), "one".parse().unwrap());
        let target = StorageLayers::new(storage, "two".parse().unwrap());

        let blob = source
            .put(BlobSource::trusted(Bytes::from_static(b"shared")))
            .await
            .unwrap();
        let digest = blob.digest().clone();
        let mounted = tokio::spawn(async move { target.mount(&blob).await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mounted.digest(), &digest);
    }
}
