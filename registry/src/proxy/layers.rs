use std::sync::Arc;

use http::StatusCode;

use crate::blob::{Blob, BlobSource};
use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};
use crate::layers::Layers;
use crate::name::RepoName;
use crate::proxy::client::RemoteRegistry;

/// Read-through [`Layers`] over a remote registry.
///
/// Returned blob content is the remote response body and can be read
/// exactly once.
#[derive(Debug, Clone)]
pub struct ProxyLayers {
    remote: Arc<dyn RemoteRegistry>,
    name: RepoName,
}

impl ProxyLayers {
    /// Blob reads for `name` forwarded to the remote registry.
    pub fn new(remote: Arc<dyn RemoteRegistry>, name: RepoName) -> Self {
        Self { remote, name }
    }
}

#[async_trait::async_trait]
impl Layers for ProxyLayers {
    async fn put(&self, _source: BlobSource) -> RegistryResult<Blob> {
        Err(RegistryError::Unsupported("blob put on a proxy repository"))
    }

    #[tracing::instrument(skip(self), fields(repo = %self.name, digest = %digest))]
    async fn get(&self, digest: &Digest) -> RegistryResult<Option<Blob>> {
        let response = self
            .remote
            .get(&format!("/v2/{}/blobs/{}", self.name, digest), None)
            .await?;
        match response.status {
            StatusCode::OK => Ok(Some(Blob::streamed(digest.clone(), response.body))),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(RegistryError::UnexpectedStatus(status)),
        }
    }

    async fn mount(&self, _blob: &Blob) -> RegistryResult<Blob> {
        Err(RegistryError::Unsupported(
            "blob mount on a proxy repository",
        ))
    }
}
