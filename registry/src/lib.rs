//! # Docker Registry v2 domain core
//!
//! The storage-backed state machine behind a registry: content-addressed
//! blobs ([`Layers`]), chunked upload sessions with digest-verified commit
//! ([`Uploads`]), manifests stored by digest with tags as movable pointers
//! ([`Manifests`]), and paginated tag/catalog listings. Every store also has
//! a read-through [`proxy`] twin over a remote registry.
//!
//! The HTTP surface, configuration, and authorization live in collaborators;
//! this crate exposes the contracts they call into ([`Docker`], [`Repo`])
//! and maps its errors onto OCI status and error codes.

use bytes::Bytes;
use camino::Utf8Path;
use storage::Storage;

mod blob;
mod content;
mod digest;
mod docker;
mod error;
mod layers;
mod layout;
mod manifests;
mod name;
pub mod proxy;
mod reference;
mod tags;
mod uploads;

pub use blob::{Blob, BlobSource};
pub use content::Content;
pub use digest::{Digest, Digester};
pub use docker::{Docker, Repo, StorageDocker, StorageRepo};
pub use error::{RegistryError, RegistryResult};
pub use layers::{Layers, StorageLayers};
pub use manifests::{MANIFEST_MEDIA_TYPES, Manifest, Manifests, StorageManifests};
pub use name::{RepoName, Tag};
pub use reference::ManifestReference;
pub use tags::{Catalog, TagList};
pub use uploads::{Upload, Uploads};

/// Read a key, mapping "not found" to `None`.
pub(crate) async fn value_opt(
    storage: &Storage,
    key: &Utf8Path,
) -> Result<Option<Bytes>, RegistryError> {
    match storage.value(key).await {
        Ok(data) => Ok(Some(data)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}
