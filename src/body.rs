//! Streaming request bodies.
//!
//! Handlers read request bodies as a tokio [`AsyncRead`]. hyper delivers
//! them as a stream of frames; [`BodyReader`] bridges the two.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Buf, Bytes};
use hyper::body::Body as HttpBody;
use tokio::io::{AsyncRead, ReadBuf};

/// A request body: any boxed byte source.
pub struct Body(Box<dyn AsyncRead + Unpin + Send>);

impl Body {
    pub fn new(source: impl AsyncRead + Unpin + Send + 'static) -> Self {
        Self(Box::new(source))
    }

    /// A body that is immediately at EOF.
    pub fn empty() -> Self {
        Self::new(tokio::io::empty())
    }
}

impl Default for Body {
    fn default() -> Self { Self::empty() }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Body")
    }
}

impl AsyncRead for Body {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().0).poll_read(cx, buf)
    }
}

// ── BodyReader ────────────────────────────────────────────────────────────────

/// [`AsyncRead`] over an HTTP body stream. Trailers are skipped.
pub struct BodyReader<B> {
    body: B,
    chunk: Bytes,
    done: bool,
}

impl<B> BodyReader<B> {
    pub fn new(body: B) -> Self {
        Self { body, chunk: Bytes::new(), done: false }
    }
}

impl<B> AsyncRead for BodyReader<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        while this.chunk.is_empty() && !this.done {
            match ready!(Pin::new(&mut this.body).poll_frame(cx)) {
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data() {
                        this.chunk = data;
                    }
                }
                Some(Err(e)) => return Poll::Ready(Err(io::Error::other(e))),
                None => this.done = true,
            }
        }
        let n = this.chunk.len().min(buf.remaining());
        buf.put_slice(&this.chunk[..n]);
        this.chunk.advance(n);
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{Empty, Full};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn reads_full_body() {
        let mut reader = BodyReader::new(Full::new(Bytes::from_static(b"payload")));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"payload");
    }

    #[tokio::test]
    async fn small_reads_drain_chunk_across_calls() {
        let mut reader = BodyReader::new(Full::new(Bytes::from_static(b"abcdef")));
        let mut small = [0u8; 4];
        assert_eq!(reader.read(&mut small).await.unwrap(), 4);
        assert_eq!(&small, b"abcd");
        assert_eq!(reader.read(&mut small).await.unwrap(), 2);
        assert_eq!(&small[..2], b"ef");
        assert_eq!(reader.read(&mut small).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_body_is_eof() {
        let mut reader = BodyReader::new(Empty::<Bytes>::new());
        let mut body = Body::new(tokio::io::empty());
        let mut out = Vec::new();
        assert_eq!(reader.read_to_end(&mut out).await.unwrap(), 0);
        assert_eq!(body.read_to_end(&mut out).await.unwrap(), 0);
    }
}
