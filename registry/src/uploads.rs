//! Chunked blob upload sessions

use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use storage::Storage;
use tokio::sync::Mutex;

use crate::blob::{Blob, BlobSource};
use crate::digest::{Digest, Digester};
use crate::error::{RegistryError, RegistryResult};
use crate::layers::Layers;
use crate::layout;
use crate::name::RepoName;

/// Per-session append locks, shared across every handle to a session.
pub(crate) type SessionLocks = Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Upload session registry for one repository.
///
/// Obtained through [`Repo::uploads`][crate::Repo::uploads], so every handle
/// over the same registry shares one lock per session id and appends to the
/// same session serialize even across handles.
#[derive(Debug, Clone)]
pub struct Uploads {
    storage: Storage,
    name: RepoName,
    locks: SessionLocks,
}

impl Uploads {
    pub(crate) fn shared(storage: Storage, name: RepoName, locks: SessionLocks) -> Self {
        Self {
            storage,
            name,
            locks,
        }
    }

    async fn lock_for(&self, uuid: &str) -> Arc<Mutex<()>> {
        let key = layout::upload_root(&self.name, uuid).into_string();
        let mut locks = self.locks.lock().await;
        locks.entry(key).or_default().clone()
    }

    fn upload(&self, uuid: String, lock: Arc<Mutex<()>>) -> Upload {
        Upload {
            storage: self.storage.clone(),
            name: self.name.clone(),
            uuid,
            lock,
            locks: self.locks.clone(),
        }
    }

    /// Start a new session with a fresh id and a start timestamp.
    #[tracing::instrument(skip(self), fields(repo = %self.name))]
    pub async fn start(&self) -> RegistryResult<Upload> {
        let uuid = uuid::Uuid::new_v4().to_string();
        self.storage
            .save(
                &layout::upload_started(&self.name, &uuid),
                Bytes::from(Utc::now().to_rfc3339()),
            )
            .await?;
        tracing::debug!(%uuid, "started upload session");
        Ok(self.upload(uuid.clone(), self.lock_for(&uuid).await))
    }

    /// Look up an existing session by id.
    pub async fn get(&self, uuid: &str) -> RegistryResult<Option<Upload>> {
        if !self
            .storage
            .exists(&layout::upload_started(&self.name, uuid))
            .await?
        {
            return Ok(None);
        }
        Ok(Some(
            self.upload(uuid.to_string(), self.lock_for(uuid).await),
        ))
    }
}

/// One chunked upload session.
///
/// Chunks are stored under keys named by their starting offset, so the
/// lexicographic key order is the wire order. The session ends with a
/// digest-verified [`put_to`][Upload::put_to] or a [`cancel`][Upload::cancel].
#[derive(Debug, Clone)]
pub struct Upload {
    storage: Storage,
    name: RepoName,
    uuid: String,
    lock: Arc<Mutex<()>>,
    locks: SessionLocks,
}

impl Upload {
    /// The session id.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// When the session was started.
    pub async fn started(&self) -> RegistryResult<DateTime<Utc>> {
        let raw = self
            .storage
            .value(&layout::upload_started(&self.name, &self.uuid))
            .await?;
        let text = std::str::from_utf8(&raw)
            .map_err(|_| RegistryError::BlobUploadInvalid(self.uuid.clone()))?;
        Ok(DateTime::parse_from_rfc3339(text)
            .map_err(|_| RegistryError::BlobUploadInvalid(self.uuid.clone()))?
            .with_timezone(&Utc))
    }

    /// Append the next chunk, returning the new offset.
    #[tracing::instrument(skip(self, chunk), fields(repo = %self.name, uuid = %self.uuid, len = chunk.len()))]
    pub async fn append(&self, chunk: Bytes) -> RegistryResult<u64> {
        let _guard = self.lock.lock().await;
        let offset = self.current_offset().await?;
        // An empty chunk would reuse the previous chunk's offset key.
        if chunk.is_empty() {
            return Ok(offset);
        }
        let len = chunk.len() as u64;
        self.storage
            .save(&layout::upload_chunk(&self.name, &self.uuid, offset), chunk)
            .await?;
        Ok(offset + len)
    }

    /// Number of bytes appended so far.
    pub async fn offset(&self) -> RegistryResult<u64> {
        self.current_offset().await
    }

    async fn current_offset(&self) -> RegistryResult<u64> {
        let chunks = self
            .storage
            .list(&layout::upload_chunks(&self.name, &self.uuid))
            .await?;
        let mut offset = 0;
        for key in &chunks {
            offset += self.storage.metadata(key).await?.size;
        }
        Ok(offset)
    }

    /// Commit the accumulated content as a blob.
    ///
    /// The content digest must match `digest`; on mismatch nothing is
    /// written or linked and the session stays intact so the client can
    /// retry. On success the session is deleted.
    #[tracing::instrument(skip(self, layers), fields(repo = %self.name, uuid = %self.uuid, digest = %digest))]
    pub async fn put_to(&self, layers: &dyn Layers, digest: &Digest) -> RegistryResult<Blob> {
        let _guard = self.lock.lock().await;
        let mut keys = self
            .storage
            .list(&layout::upload_chunks(&self.name, &self.uuid))
            .await?;
        keys.sort();

        let mut digester = Digester::new();
        let mut content = BytesMut::new();
        for key in &keys {
            let chunk = self.storage.value(key).await?;
            digester.update(&chunk);
            content.extend_from_slice(&chunk);
        }
        let actual = digester.finish();
        if actual != *digest {
            return Err(RegistryError::DigestMismatch {
                expected: digest.to_string(),
                actual: actual.to_string(),
            });
        }

        let blob = layers
            .put(BlobSource::verified(digest.clone(), content.freeze()))
            .await?;
        self.delete_session().await?;
        tracing::debug!("upload committed");
        Ok(blob)
    }

    /// Discard the session and everything appended to it.
    #[tracing::instrument(skip(self), fields(repo = %self.name, uuid = %self.uuid))]
    pub async fn cancel(&self) -> RegistryResult<()> {
        let _guard = self.lock.lock().await;
        self.delete_session().await
    }

    async fn delete_session(&self) -> RegistryResult<()> {
        let root = layout::upload_root(&self.name, &self.uuid);
        let keys = self.storage.list(&root).await?;
        for key in &keys {
            self.storage.delete(key).await?;
        }
        // The session is gone; drop its lock entry so the map does not
        // grow for the lifetime of the registry.
        self.locks.lock().await.remove(root.as_str());
        Ok(())
    }
}
