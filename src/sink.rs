//! Response byte sinks.
//!
//! A [`ResponseSink`] is anything a response body can be written into: a
//! tokio [`AsyncWrite`] plus an optional bulk-copy fast path. The fast path is
//! the sink's own business. Callers always go through
//! [`ResponseSink::copy_from`] and get the cheapest copy the sink offers.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

/// Boxed future returned by [`ResponseSink::copy_from`]. Resolves to the
/// number of bytes copied.
pub type CopyFuture<'a> = Pin<Box<dyn Future<Output = io::Result<u64>> + Send + 'a>>;

/// A byte sink a response body is rendered into.
pub trait ResponseSink: AsyncWrite + Unpin + Send {
    /// Drains `reader` into the sink and returns the number of bytes copied.
    ///
    /// The default relays through `poll_write` with [`tokio::io::copy`].
    /// Override it when the sink can take bytes straight from the reader.
    fn copy_from<'a>(&'a mut self, reader: &'a mut (dyn AsyncRead + Unpin + Send)) -> CopyFuture<'a> {
        Box::pin(tokio::io::copy(reader, self))
    }
}

impl<S: ResponseSink + ?Sized> ResponseSink for &mut S {
    fn copy_from<'a>(&'a mut self, reader: &'a mut (dyn AsyncRead + Unpin + Send)) -> CopyFuture<'a> {
        (**self).copy_from(reader)
    }
}

impl<S: ResponseSink + ?Sized> ResponseSink for Box<S> {
    fn copy_from<'a>(&'a mut self, reader: &'a mut (dyn AsyncRead + Unpin + Send)) -> CopyFuture<'a> {
        (**self).copy_from(reader)
    }
}

impl ResponseSink for Vec<u8> {}

// ── BodySink ──────────────────────────────────────────────────────────────────

/// Read-side chunk reserved per bulk-copy step.
const RESERVE: usize = 32 * 1024;

/// In-memory sink the server renders response bodies into before handing
/// them to hyper.
#[derive(Debug, Default)]
pub struct BodySink {
    buf: BytesMut,
}

impl BodySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize { self.buf.len() }
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }
    pub fn as_bytes(&self) -> &[u8] { &self.buf }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

impl AsyncWrite for BodySink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().buf.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl ResponseSink for BodySink {
    /// Reads straight into the body buffer, skipping the intermediate window.
    fn copy_from<'a>(&'a mut self, reader: &'a mut (dyn AsyncRead + Unpin + Send)) -> CopyFuture<'a> {
        Box::pin(async move {
            let mut copied = 0u64;
            loop {
                self.buf.reserve(RESERVE);
                let n = reader.read_buf(&mut self.buf).await?;
                if n == 0 {
                    return Ok(copied);
                }
                copied += n as u64;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn body_sink_collects_writes() {
        let mut sink = BodySink::new();
        sink.write_all(b"hello ").await.unwrap();
        sink.write_all(b"world").await.unwrap();
        assert_eq!(sink.into_bytes(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn body_sink_bulk_copy_reads_everything() {
        let payload = vec![42u8; 100_000];
        let mut reader: &[u8] = &payload;
        let mut sink = BodySink::new();

        let copied = sink.copy_from(&mut reader).await.unwrap();
        assert_eq!(copied, 100_000);
        assert_eq!(sink.as_bytes(), &payload[..]);
    }

    #[tokio::test]
    async fn default_copy_relays_through_writes() {
        let mut reader: &[u8] = b"relayed";
        let mut sink: Vec<u8> = Vec::new();

        let copied = sink.copy_from(&mut reader).await.unwrap();
        assert_eq!(copied, 7);
        assert_eq!(sink, b"relayed");
    }
}
