//! Remote registry transport

use std::fmt;

use futures::TryStreamExt;
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::content::Content;
use crate::error::{RegistryError, RegistryResult};

/// A remote registry response: status, headers, and the body stream.
#[derive(Debug)]
pub struct RemoteResponse {
    /// The response status.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body, readable exactly once.
    pub body: Content,
}

impl RemoteResponse {
    /// A header value, when present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Read-only transport to a remote registry.
///
/// The proxy stores are written against this seam so tests can substitute
/// a scripted transport.
#[async_trait::async_trait]
pub trait RemoteRegistry: fmt::Debug + Send + Sync {
    /// Perform a GET against a registry path such as `/v2/<name>/blobs/<digest>`.
    async fn get(&self, path: &str, accept: Option<&str>) -> RegistryResult<RemoteResponse>;
}

/// [`RemoteRegistry`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base: Url,
}

impl HttpRegistry {
    /// Talk to the registry at `base`, e.g. `https://registry-1.docker.io`.
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }
}

#[async_trait::async_trait]
impl RemoteRegistry for HttpRegistry {
    #[tracing::instrument(skip(self), fields(base = %self.base))]
    async fn get(&self, path: &str, accept: Option<&str>) -> RegistryResult<RemoteResponse> {
        let url = self.base.join(path).map_err(RegistryError::remote)?;
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(http::header::ACCEPT, accept);
        }
        let response = request.send().await.map_err(RegistryError::remote)?;

        let status = response.status();
        let headers = response.headers().clone();
        let size = response.content_length();
        tracing::trace!(%status, "remote registry response");
        Ok(RemoteResponse {
            status,
            headers,
            body: Content::streamed(
                response.bytes_stream().map_err(RegistryError::remote),
                size,
            ),
        })
    }
}
