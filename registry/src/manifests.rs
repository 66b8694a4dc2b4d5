//! Manifest stores

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use storage::Storage;

use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};
use crate::layout;
use crate::name::{RepoName, Tag};
use crate::reference::ManifestReference;
use crate::tags::{TagList, page};

/// Manifest media types this registry accepts and requests from remotes.
pub const MANIFEST_MEDIA_TYPES: &[&str] = &[
    "application/vnd.docker.distribution.manifest.v2+json",
    "application/vnd.docker.distribution.manifest.list.v2+json",
    "application/vnd.oci.image.manifest.v1+json",
    "application/vnd.oci.image.index.v1+json",
];

/// An image manifest: its digest plus the raw JSON content.
#[derive(Debug, Clone)]
pub struct Manifest {
    digest: Digest,
    content: Bytes,
    json: serde_json::Value,
}

impl Manifest {
    /// Wrap manifest content, requiring it to be well-formed JSON.
    pub fn new(digest: Digest, content: Bytes) -> RegistryResult<Self> {
        let json = serde_json::from_slice(&content)
            .map_err(|err| RegistryError::InvalidManifest(err.to_string()))?;
        Ok(Self {
            digest,
            content,
            json,
        })
    }

    /// The canonical digest of the content.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// The raw JSON bytes.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// The manifest's media type; must be present and non-empty.
    pub fn media_type(&self) -> RegistryResult<&str> {
        self.json
            .get("mediaType")
            .and_then(serde_json::Value::as_str)
            .filter(|media_type| !media_type.is_empty())
            .ok_or_else(|| {
                RegistryError::InvalidManifest("missing or empty mediaType".to_string())
            })
    }

    /// The config blob digest, for image manifests that carry one.
    pub fn config(&self) -> RegistryResult<Option<Digest>> {
        self.json
            .pointer("/config/digest")
            .and_then(serde_json::Value::as_str)
            .map(Digest::from_str)
            .transpose()
    }

    /// Digests of the layer blobs the manifest references.
    pub fn layers(&self) -> RegistryResult<Vec<Digest>> {
        let Some(layers) = self.json.get("layers").and_then(serde_json::Value::as_array) else {
            return Ok(Vec::new());
        };
        layers
            .iter()
            .map(|layer| {
                layer
                    .get("digest")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| {
                        RegistryError::InvalidManifest("layer without a digest".to_string())
                    })
                    .and_then(Digest::from_str)
            })
            .collect()
    }
}

/// Manifest store scoped to one repository.
///
/// Manifests are stored by digest; tags are movable pointers onto digests.
#[async_trait::async_trait]
pub trait Manifests: fmt::Debug + Send + Sync {
    /// Validate and store a manifest, updating the tag pointer for tag refs.
    async fn put(&self, reference: &ManifestReference, content: Bytes)
    -> RegistryResult<Manifest>;

    /// Resolve a reference to its manifest.
    async fn get(&self, reference: &ManifestReference) -> RegistryResult<Option<Manifest>>;

    /// List tags in lexicographic order, strictly after `from`.
    async fn tags(&self, from: Option<&Tag>, limit: usize) -> RegistryResult<TagList>;
}

/// [`Manifests`] backed by a [`Storage`].
#[derive(Debug, Clone)]
pub struct StorageManifests {
    storage: Storage,
    name: RepoName,
}

impl StorageManifests {
    /// Manifest store for `name` over the given storage.
    pub fn new(storage: Storage, name: RepoName) -> Self {
        Self { storage, name }
    }

    /// Referenced blobs must already be in the store.
    async fn validate(&self, manifest: &Manifest) -> RegistryResult<()> {
        manifest.media_type()?;
        let mut referenced = manifest.layers()?;
        referenced.extend(manifest.config()?);
        for digest in &referenced {
            if !self.storage.exists(&layout::blob_data(digest)).await? {
                return Err(RegistryError::InvalidManifest(format!(
                    "referenced blob {digest} does not exist"
                )));
            }
        }
        Ok(())
    }

    async fn save_link(
        &self,
        reference: &ManifestReference,
        digest: &Digest,
    ) -> RegistryResult<()> {
        self.storage
            .save(
                &layout::manifest_link(&self.name, reference),
                Bytes::from(digest.to_string()),
            )
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Manifests for StorageManifests {
    #[tracing::instrument(skip(self, content), fields(repo = %self.name, reference = %reference))]
    async fn put(
        &self,
        reference: &ManifestReference,
        content: Bytes,
    ) -> RegistryResult<Manifest> {
        let digest = Digest::sha256(&content);
        let manifest = Manifest::new(digest.clone(), content.clone())?;
        self.validate(&manifest).await?;

        self.storage
            .save(&layout::blob_data(&digest), content)
            .await?;
        self.save_link(&ManifestReference::Digest(digest.clone()), &digest)
            .await?;
        if reference.tag().is_some() {
            self.save_link(reference, &digest).await?;
        }
        Ok(manifest)
    }

    async fn get(&self, reference: &ManifestReference) -> RegistryResult<Option<Manifest>> {
        let link = layout::manifest_link(&self.name, reference);
        let Some(raw) = crate::value_opt(&self.storage, &link).await? else {
            return Ok(None);
        };
        let digest: Digest = std::str::from_utf8(&raw)
            .map_err(|_| RegistryError::InvalidDigest(format!("corrupt link {link}")))?
            .parse()?;
        let Some(content) = crate::value_opt(&self.storage, &layout::blob_data(&digest)).await?
        else {
            return Ok(None);
        };
        Ok(Some(Manifest::new(digest, content)?))
    }

    async fn tags(&self, from: Option<&Tag>, limit: usize) -> RegistryResult<TagList> {
        let root = layout::tags_root(&self.name);
        let keys = self.storage.list(&root).await?;
        let mut tags: Vec<Tag> = keys
            .iter()
            .filter_map(|key| key.strip_prefix(&root).ok())
            .filter_map(|rest| rest.components().next())
            .filter_map(|component| component.as_str().parse().ok())
            .collect();
        tags.sort();
        tags.dedup();
        Ok(TagList {
            name: self.name.clone(),
            tags: page(tags, from, limit),
        })
    }
}
