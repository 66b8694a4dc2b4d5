//! # Streaming `multipart/*` body parser
//!
//! Splits a chunked byte stream into its body parts without buffering whole
//! parts in memory. The input may be cut at any byte: boundaries, header
//! lines, and bodies are reassembled across chunks.
//!
//! [`Multipart::parts`] yields each [`Part`] in order; a part exposes its
//! [`Headers`] up front and streams its body. Parts must be consumed one at
//! a time: the next part is not parsed until the current body is drained or
//! dropped. [`Multipart::inspect`] and [`Multipart::filter`] select parts by
//! their headers, draining the rest.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::{Future, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

mod headers;
mod sequencer;
mod tokenizer;

pub use headers::Headers;

use sequencer::{Event, Sequencer};

/// Errors raised while parsing a multipart body.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MultipartError {
    /// The `Content-Type` value could not be parsed as a mime type.
    #[error("invalid content type: {0:?}")]
    InvalidContentType(String),

    /// The mime type carries no `boundary` parameter.
    #[error("multipart content type has no boundary parameter")]
    MissingBoundary,

    /// A part declared more header bytes than the parser accepts.
    #[error("part header block exceeds {limit} bytes")]
    HeaderBlockTooLarge {
        /// The accepted header block size in bytes.
        limit: usize,
    },

    /// A header line without a `name: value` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// The underlying byte stream failed.
    #[error("upstream body error: {0}")]
    Upstream(String),
}

impl MultipartError {
    /// Wrap a transport error from the underlying byte stream.
    pub fn upstream<E: fmt::Display>(err: E) -> Self {
        Self::Upstream(err.to_string())
    }
}

/// Decision returned by an [`inspect`][Multipart::inspect] callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Yield the part to the caller.
    Accept,
    /// Drain the part and move on.
    Ignore,
}

/// A multipart body, not yet parsed.
pub struct Multipart<S> {
    boundary: String,
    body: S,
}

impl<S> fmt::Debug for Multipart<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multipart")
            .field("boundary", &self.boundary)
            .finish_non_exhaustive()
    }
}

impl<S> Multipart<S>
where
    S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
{
    /// Wrap a request body, taking the boundary from its `Content-Type`.
    pub fn new(content_type: &str, body: S) -> Result<Self, MultipartError> {
        let mime: mime::Mime = content_type
            .parse()
            .map_err(|_| MultipartError::InvalidContentType(content_type.to_string()))?;
        let boundary = mime
            .get_param(mime::BOUNDARY)
            .ok_or(MultipartError::MissingBoundary)?
            .as_str()
            .to_string();
        Ok(Self { boundary, body })
    }

    /// The boundary the parts are delimited with.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parse the body into a stream of parts.
    ///
    /// Parsing runs on a background task and stays one part ahead at most.
    /// Dropping the returned stream cancels it.
    pub fn parts(self) -> PartStream {
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(drive(self.boundary, self.body, tx));
        PartStream {
            inner: ReceiverStream::new(rx),
            task,
        }
    }

    /// Yield the parts an async callback accepts, draining the rest.
    pub fn inspect<F, Fut>(
        self,
        mut inspect: F,
    ) -> impl Stream<Item = Result<Part, MultipartError>> + Send
    where
        F: FnMut(&Headers) -> Fut + Send + 'static,
        Fut: Future<Output = Verdict> + Send,
    {
        let mut parts = self.parts();
        async_stream::try_stream! {
            while let Some(part) = parts.next().await {
                let part = part?;
                match inspect(part.headers()).await {
                    Verdict::Accept => yield part,
                    Verdict::Ignore => part.drain().await,
                }
            }
        }
    }

    /// Yield the parts whose headers match a predicate, draining the rest.
    pub fn filter<P>(self, mut keep: P) -> impl Stream<Item = Result<Part, MultipartError>> + Send
    where
        P: FnMut(&Headers) -> bool + Send + 'static,
    {
        self.inspect(move |headers| {
            std::future::ready(if keep(headers) {
                Verdict::Accept
            } else {
                Verdict::Ignore
            })
        })
    }
}

/// Stream of parsed [`Part`]s, in body order.
#[derive(Debug)]
pub struct PartStream {
    inner: ReceiverStream<Result<Part, MultipartError>>,
    task: tokio::task::JoinHandle<()>,
}

impl Stream for PartStream {
    type Item = Result<Part, MultipartError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for PartStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One part of a multipart body: its headers plus a stream of body bytes.
///
/// Dropping a part without draining it skips the rest of its body.
#[derive(Debug)]
pub struct Part {
    headers: Headers,
    body: mpsc::UnboundedReceiver<Bytes>,
    done: Option<oneshot::Sender<()>>,
}

impl Part {
    /// The part's headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Collect the whole body into a single buffer.
    pub async fn bytes(mut self) -> Bytes {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk);
        }
        buf.freeze()
    }

    async fn drain(mut self) {
        while self.next().await.is_some() {}
    }
}

impl Stream for Part {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.body.poll_recv(cx) {
            Poll::Ready(None) => {
                if let Some(done) = self.done.take() {
                    let _ = done.send(());
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

struct OpenPart {
    body: mpsc::UnboundedSender<Bytes>,
    done: oneshot::Receiver<()>,
}

async fn drive<S>(boundary: String, body: S, tx: mpsc::Sender<Result<Part, MultipartError>>)
where
    S: Stream<Item = Result<Bytes, MultipartError>> + Send + 'static,
{
    tracing::trace!(%boundary, "parsing multipart body");
    let mut sequencer = Sequencer::new(&boundary);
    futures::pin_mut!(body);
    let mut open = None;
    loop {
        let (events, last) = match body.next().await {
            Some(Ok(chunk)) => (sequencer.push(&chunk), false),
            Some(Err(err)) => {
                let _ = tx.send(Err(err)).await;
                return;
            }
            None => (sequencer.finish(), true),
        };
        let events = match events {
            Ok(events) => events,
            Err(err) => {
                tracing::debug!(error = %err, "multipart body rejected");
                let _ = tx.send(Err(err)).await;
                return;
            }
        };
        if dispatch(events, &tx, &mut open).await.is_err() || last {
            return;
        }
    }
}

/// Forward parser events to the consumer.
///
/// Waits for the open part to be drained or dropped before moving past its
/// end, so at most one part is ever live. Errors when the consumer is gone.
async fn dispatch(
    events: Vec<Event>,
    tx: &mpsc::Sender<Result<Part, MultipartError>>,
    open: &mut Option<OpenPart>,
) -> Result<(), ()> {
    for event in events {
        match event {
            Event::Headers(headers) => {
                let (body_tx, body_rx) = mpsc::unbounded_channel();
                let (done_tx, done_rx) = oneshot::channel();
                let part = Part {
                    headers,
                    body: body_rx,
                    done: Some(done_tx),
                };
                if tx.send(Ok(part)).await.is_err() {
                    return Err(());
                }
                *open = Some(OpenPart {
                    body: body_tx,
                    done: done_rx,
                });
            }
            Event::Body(data) => {
                if let Some(open) = open.as_ref() {
                    let _ = open.body.send(data);
                }
            }
            Event::End => {
                if let Some(OpenPart { body, done }) = open.take() {
                    drop(body);
                    // Err here means the consumer dropped the part early,
                    // skipping the rest of its body.
                    let _ = done.await;
                }
            }
        }
    }
    Ok(())
}
