use std::sync::Arc;

use http::StatusCode;

use crate::docker::{Docker, Repo};
use crate::error::{RegistryError, RegistryResult};
use crate::layers::Layers;
use crate::manifests::Manifests;
use crate::name::RepoName;
use crate::proxy::client::RemoteRegistry;
use crate::proxy::layers::ProxyLayers;
use crate::proxy::manifests::ProxyManifests;
use crate::tags::Catalog;
use crate::uploads::Uploads;

/// Read-through [`Docker`] over a remote registry.
#[derive(Debug, Clone)]
pub struct ProxyDocker {
    remote: Arc<dyn RemoteRegistry>,
}

impl ProxyDocker {
    /// A read-only registry view over the given remote.
    pub fn new(remote: Arc<dyn RemoteRegistry>) -> Self {
        Self { remote }
    }
}

#[async_trait::async_trait]
impl Docker for ProxyDocker {
    fn repo(&self, name: &RepoName) -> Box<dyn Repo> {
        Box::new(ProxyRepo {
            remote: self.remote.clone(),
            name: name.clone(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn catalog(&self, from: Option<&RepoName>, limit: usize) -> RegistryResult<Catalog> {
        let mut path = format!("/v2/_catalog?n={limit}");
        if let Some(from) = from {
            path.push_str(&format!("&last={from}"));
        }
        let response = self.remote.get(&path, None).await?;
        match response.status {
            StatusCode::OK => Catalog::from_json(&response.body.bytes().await?),
            status => Err(RegistryError::UnexpectedStatus(status)),
        }
    }
}

/// One remote repository's read-only stores.
#[derive(Debug, Clone)]
pub struct ProxyRepo {
    remote: Arc<dyn RemoteRegistry>,
    name: RepoName,
}

impl Repo for ProxyRepo {
    fn layers(&self) -> Arc<dyn Layers> {
        Arc::new(ProxyLayers::new(self.remote.clone(), self.name.clone()))
    }

    fn manifests(&self) -> Arc<dyn Manifests> {
        Arc::new(ProxyManifests::new(self.remote.clone(), self.name.clone()))
    }

    fn uploads(&self) -> RegistryResult<Uploads> {
        Err(RegistryError::Unsupported(
            "uploads on a proxy repository",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::mock::MockRegistry;

    #[tokio::test]
    async fn catalog_passes_the_remote_listing_through() {
        let mock = MockRegistry::default();
        mock.ok(
            "/v2/_catalog?n=2&last=b",
            br#"{"repositories":["c","d"]}"#,
        );
        let docker = ProxyDocker::new(Arc::new(mock));

        let from: RepoName = "b".parse().unwrap();
        let catalog = docker.catalog(Some(&from), 2).await.unwrap();
        let names: Vec<_> = catalog
            .repositories
            .iter()
            .map(RepoName::as_str)
            .collect();
        assert_eq!(names, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn uploads_fail_fast() {
        let docker = ProxyDocker::new(Arc::new(MockRegistry::default()));
        let repo = docker.repo(&"test/repo".parse().unwrap());
        assert!(matches!(
            repo.uploads(),
            Err(RegistryError::Unsupported(_))
        ));
    }
}
