//! Blobs and blob sources

use bytes::Bytes;
use camino::Utf8PathBuf;
use storage::Storage;

use crate::content::Content;
use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};
use crate::layout;

/// Where a blob's bytes come from.
#[derive(Debug)]
enum BlobContent {
    /// Content-addressed key in the backing storage; re-readable.
    Stored { storage: Storage, key: Utf8PathBuf },
    /// Remote response body; readable exactly once.
    Streamed(Content),
}

/// A content-addressed binary object.
#[derive(Debug)]
pub struct Blob {
    digest: Digest,
    size: Option<u64>,
    content: BlobContent,
}

impl Blob {
    pub(crate) fn stored(storage: Storage, digest: Digest, size: Option<u64>) -> Self {
        let key = layout::blob_data(&digest);
        Self {
            digest,
            size,
            content: BlobContent::Stored { storage, key },
        }
    }

    pub(crate) fn streamed(digest: Digest, content: Content) -> Self {
        Self {
            digest,
            size: content.size(),
            content: BlobContent::Streamed(content),
        }
    }

    /// The blob's digest.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// The blob's size in bytes.
    pub async fn size(&self) -> RegistryResult<u64> {
        match (&self.size, &self.content) {
            (Some(size), _) => Ok(*size),
            (None, BlobContent::Stored { storage, key }) => {
                Ok(storage.metadata(key).await?.size)
            }
            (None, BlobContent::Streamed(_)) => Err(RegistryError::Unsupported(
                "size of a streamed blob is unknown until read",
            )),
        }
    }

    /// The blob's content.
    ///
    /// Consumes the blob: streamed content from a proxy cannot be re-read.
    /// Stored blobs can be fetched again from their store.
    pub async fn content(self) -> RegistryResult<Content> {
        match self.content {
            BlobContent::Stored { storage, key } => {
                Ok(Content::full(storage.value(&key).await?))
            }
            BlobContent::Streamed(content) => Ok(content),
        }
    }
}

/// Bytes to be admitted into a blob store, together with their digest.
#[derive(Debug)]
pub struct BlobSource {
    digest: Digest,
    content: Bytes,
    checked: bool,
}

impl BlobSource {
    /// A source whose digest is computed from the content itself.
    pub fn trusted(content: Bytes) -> Self {
        Self {
            digest: Digest::sha256(&content),
            content,
            checked: false,
        }
    }

    /// A source whose digest was already verified by the caller.
    pub fn verified(digest: Digest, content: Bytes) -> Self {
        Self {
            digest,
            content,
            checked: false,
        }
    }

    /// A source whose content must match a caller-supplied digest.
    ///
    /// Verification happens on admission; on mismatch nothing is written.
    pub fn checked(digest: Digest, content: Bytes) -> Self {
        Self {
            digest,
            content,
            checked: true,
        }
    }

    /// The digest this source will be stored under.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub(crate) fn admit(self) -> RegistryResult<(Digest, Bytes)> {
        if self.checked {
            let actual = Digest::sha256(&self.content);
            if actual != self.digest {
                return Err(RegistryError::DigestMismatch {
                    expected: self.digest.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
        Ok((self.digest, self.content))
    }
}
