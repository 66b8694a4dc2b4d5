//! Byte content with an optional known size

use std::fmt;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::error::RegistryError;

type ContentStream = BoxStream<'static, Result<Bytes, RegistryError>>;

enum Inner {
    Full(Option<Bytes>),
    // The mutex is never locked; the stream is only reached through
    // `&mut self` via `get_mut`. It makes `Content: Sync` so blobs can be
    // held across `.await` points in `Send` futures.
    Streamed(Mutex<ContentStream>),
}

fn stream_mut(stream: &mut Mutex<ContentStream>) -> &mut ContentStream {
    stream.get_mut().unwrap_or_else(PoisonError::into_inner)
}

/// Byte content of a blob or manifest.
///
/// Fully buffered content comes from the local stores and can be collected
/// cheaply; streamed content comes from a proxy response body and can be
/// read exactly once.
pub struct Content {
    size: Option<u64>,
    inner: Inner,
}

impl Content {
    /// Fully buffered content of known size.
    pub fn full(data: Bytes) -> Self {
        Self {
            size: Some(data.len() as u64),
            inner: Inner::Full(Some(data)),
        }
    }

    /// Single-use streamed content.
    pub fn streamed<S>(stream: S, size: Option<u64>) -> Self
    where
        S: Stream<Item = Result<Bytes, RegistryError>> + Send + 'static,
    {
        Self {
            size,
            inner: Inner::Streamed(Mutex::new(stream.boxed())),
        }
    }

    /// The content size, when known up front.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Collect the whole content into one buffer.
    pub async fn bytes(mut self) -> Result<Bytes, RegistryError> {
        match self.inner {
            Inner::Full(ref mut data) => Ok(data.take().unwrap_or_default()),
            Inner::Streamed(ref mut stream) => {
                let stream = stream_mut(stream);
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl From<Bytes> for Content {
    fn from(data: Bytes) -> Self {
        Content::full(data)
    }
}

impl Stream for Content {
    type Item = Result<Bytes, RegistryError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.inner {
            Inner::Full(data) => Poll::Ready(data.take().map(Ok)),
            Inner::Streamed(stream) => stream_mut(stream).as_mut().poll_next(cx),
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            Inner::Full(_) => "full",
            Inner::Streamed(_) => "streamed",
        };
        f.debug_struct("Content")
            .field("kind", &kind)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn content_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Content>();
        assert_send_sync::<crate::blob::Blob>();
    }

    #[tokio::test]
    async fn full_content_reports_size() {
        let content = Content::full(Bytes::from_static(b"12345"));
        assert_eq!(content.size(), Some(5));
        assert_eq!(content.bytes().await.unwrap().as_ref(), b"12345");
    }

    #[tokio::test]
    async fn streamed_content_collects_in_order() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let content = Content::streamed(stream::iter(chunks), None);
        assert_eq!(content.size(), None);
        assert_eq!(content.bytes().await.unwrap().as_ref(), b"abcd");
    }

    #[tokio::test]
    async fn streamed_error_propagates() {
        let chunks: Vec<Result<Bytes, RegistryError>> =
            vec![Ok(Bytes::from_static(b"ab")), Err(RegistryError::remote("reset"))];
        let content = Content::streamed(stream::iter(chunks), Some(10));
        assert!(matches!(
            content.bytes().await,
            Err(RegistryError::Remote(_))
        ));
    }
}
