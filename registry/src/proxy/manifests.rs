use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;

use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};
use crate::manifests::{MANIFEST_MEDIA_TYPES, Manifest, Manifests};
use crate::name::{RepoName, Tag};
use crate::proxy::client::RemoteRegistry;
use crate::reference::ManifestReference;
use crate::tags::TagList;

/// The `Accept` value sent with manifest requests.
pub(crate) fn manifest_accept() -> String {
    MANIFEST_MEDIA_TYPES.join(", ")
}

/// Read-through [`Manifests`] over a remote registry.
#[derive(Debug, Clone)]
pub struct ProxyManifests {
    remote: Arc<dyn RemoteRegistry>,
    name: RepoName,
}

impl ProxyManifests {
    /// Manifest reads for `name` forwarded to the remote registry.
    pub fn new(remote: Arc<dyn RemoteRegistry>, name: RepoName) -> Self {
        Self { remote, name }
    }
}

#[async_trait::async_trait]
impl Manifests for ProxyManifests {
    async fn put(
        &self,
        _reference: &ManifestReference,
        _content: Bytes,
    ) -> RegistryResult<Manifest> {
        Err(RegistryError::Unsupported(
            "manifest put on a proxy repository",
        ))
    }

    #[tracing::instrument(skip(self), fields(repo = %self.name, reference = %reference))]
    async fn get(&self, reference: &ManifestReference) -> RegistryResult<Option<Manifest>> {
        let response = self
            .remote
            .get(
                &format!("/v2/{}/manifests/{}", self.name, reference),
                Some(&manifest_accept()),
            )
            .await?;
        match response.status {
            StatusCode::OK => {
                let digest = response
                    .header("docker-content-digest")
                    .map(str::parse)
                    .transpose()?;
                let content = response.body.bytes().await?;
                let digest = match digest {
                    Some(digest) => digest,
                    None => Digest::sha256(&content),
                };
                Ok(Some(Manifest::new(digest, content)?))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(RegistryError::UnexpectedStatus(status)),
        }
    }

    async fn tags(&self, from: Option<&Tag>, limit: usize) -> RegistryResult<TagList> {
        let mut path = format!("/v2/{}/tags/list?n={limit}", self.name);
        if let Some(from) = from {
            path.push_str(&format!("&last={from}"));
        }
        let response = self.remote.get(&path, None).await?;
        match response.status {
            StatusCode::OK => TagList::from_json(&response.body.bytes().await?),
            status => Err(RegistryError::UnexpectedStatus(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::mock::MockRegistry;

    const MANIFEST: &[u8] = br#"{"mediaType":"application/vnd.oci.image.manifest.v1+json","layers":[]}"#;

    fn manifests(mock: MockRegistry) -> ProxyManifests {
        ProxyManifests::new(Arc::new(mock), "test/repo".parse().unwrap())
    }

    #[tokio::test]
    async fn digest_comes_from_the_response_header() {
        let mock = MockRegistry::default();
        mock.ok_with_header(
            "/v2/test/repo/manifests/latest",
            MANIFEST,
            "docker-content-digest",
            "sha256:feedface",
        );
        let store = manifests(mock.clone());

        let reference: ManifestReference = "latest".parse().unwrap();
        let manifest = store.get(&reference).await.unwrap().unwrap();
        assert_eq!(manifest.digest().to_string(), "sha256:feedface");
        assert_eq!(manifest.content().as_ref(), MANIFEST);

        let accept = mock.last_accept().unwrap();
        for media_type in MANIFEST_MEDIA_TYPES {
            assert!(accept.contains(media_type), "{media_type}");
        }
    }

    #[tokio::test]
    async fn digest_is_computed_when_header_is_absent() {
        let mock = MockRegistry::default();
        mock.ok("/v2/test/repo/manifests/latest", MANIFEST);

        let reference: ManifestReference = "latest".parse().unwrap();
        let manifest = manifests(mock).get(&reference).await.unwrap().unwrap();
        assert_eq!(manifest.digest(), &Digest::sha256(MANIFEST));
    }

    #[tokio::test]
    async fn missing_manifest_is_none() {
        let mock = MockRegistry::default();
        mock.status("/v2/test/repo/manifests/gone", StatusCode::NOT_FOUND);

        let reference: ManifestReference = "gone".parse().unwrap();
        assert!(manifests(mock).get(&reference).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unexpected_status_is_an_error() {
        let mock = MockRegistry::default();
        mock.status(
            "/v2/test/repo/manifests/latest",
            StatusCode::UNAUTHORIZED,
        );

        let reference: ManifestReference = "latest".parse().unwrap();
        let err = manifests(mock).get(&reference).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnexpectedStatus(StatusCode::UNAUTHORIZED)
        ));
    }

    #[tokio::test]
    async fn tags_pass_the_remote_listing_through() {
        let mock = MockRegistry::default();
        mock.ok(
            "/v2/test/repo/tags/list?n=2&last=b",
            br#"{"name":"test/repo","tags":["c","d"]}"#,
        );

        let from: Tag = "b".parse().unwrap();
        let listed = manifests(mock).tags(Some(&from), 2).await.unwrap();
        let names: Vec<_> = listed.tags.iter().map(Tag::as_str).collect();
        assert_eq!(names, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn put_is_unsupported() {
        let mock = MockRegistry::default();
        let reference: ManifestReference = "latest".parse().unwrap();
        let err = manifests(mock)
            .put(&reference, Bytes::from_static(MANIFEST))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unsupported(_)));
    }
}
