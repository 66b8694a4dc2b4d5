//! Read-through proxying against a remote registry
//!
//! Each local store has a proxy twin that forwards reads as HTTP calls and
//! translates the response: 200 is the value, 404 is `None`, anything else
//! is [`RegistryError::UnexpectedStatus`][crate::RegistryError]. Mutations
//! fail fast with `Unsupported`.

mod client;
mod docker;
mod layers;
mod manifests;

pub use client::{HttpRegistry, RemoteRegistry, RemoteResponse};
pub use docker::{ProxyDocker, ProxyRepo};
pub use layers::ProxyLayers;
pub use manifests::ProxyManifests;

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use http::{HeaderMap, HeaderName, StatusCode};

    use super::client::{RemoteRegistry, RemoteResponse};
    use crate::content::Content;
    use crate::error::RegistryResult;

    /// Scripted transport for proxy tests.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct MockRegistry {
        inner: Arc<Mutex<Inner>>,
    }

    #[derive(Debug, Default)]
    struct Inner {
        responses: HashMap<String, (StatusCode, HeaderMap, Bytes)>,
        last_accept: Option<String>,
    }

    impl MockRegistry {
        pub(crate) fn ok(&self, path: &str, body: &[u8]) {
            self.respond(path, StatusCode::OK, HeaderMap::new(), body);
        }

        pub(crate) fn ok_with_header(&self, path: &str, body: &[u8], name: &str, value: &str) {
            let mut headers = HeaderMap::new();
            headers.insert(
                HeaderName::try_from(name).unwrap(),
                value.parse().unwrap(),
            );
            self.respond(path, StatusCode::OK, headers, body);
        }

        pub(crate) fn status(&self, path: &str, status: StatusCode) {
            self.respond(path, status, HeaderMap::new(), b"");
        }

        fn respond(&self, path: &str, status: StatusCode, headers: HeaderMap, body: &[u8]) {
            let mut inner = self.inner.lock().unwrap();
            inner.responses.insert(
                path.to_string(),
                (status, headers, Bytes::copy_from_slice(body)),
            );
        }

        pub(crate) fn last_accept(&self) -> Option<String> {
            self.inner.lock().unwrap().last_accept.clone()
        }
    }

    #[async_trait::async_trait]
    impl RemoteRegistry for MockRegistry {
        async fn get(&self, path: &str, accept: Option<&str>) -> RegistryResult<RemoteResponse> {
            let mut inner = self.inner.lock().unwrap();
            inner.last_accept = accept.map(str::to_string);
            let (status, headers, body) = inner
                .responses
                .get(path)
                .cloned()
                .unwrap_or((StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::new()));
            Ok(RemoteResponse {
                status,
                headers,
                body: Content::full(body),
            })
        }
    }
}
