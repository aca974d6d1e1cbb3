//! Capture wrapper around the inbound byte source.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, ReadBuf};

use crate::capture::CaptureBuffer;

/// Mirrors every byte read from an inner source into a bounded buffer.
///
/// The caller sees exactly the bytes, EOF and errors the inner source
/// produces. What was read is recorded in a [`RequestTap`]: the wrapper
/// itself usually moves into the handler along with the request, and the
/// tap is how the interceptor gets at the results afterwards.
#[derive(Debug)]
pub struct RequestCapture<R> {
    inner: R,
    tap: RequestTap,
}

impl<R> RequestCapture<R> {
    pub fn new(inner: R, buffer: CaptureBuffer) -> Self {
        Self::with_tap(inner, RequestTap::new(buffer))
    }

    /// Wraps `inner`, recording into an existing tap.
    pub fn with_tap(inner: R, tap: RequestTap) -> Self {
        Self { inner, tap }
    }

    /// A handle onto this capture's buffer and counter.
    pub fn tap(&self) -> RequestTap { self.tap.clone() }

    pub fn bytes_read(&self) -> u64 { self.tap.bytes_read() }
    pub fn get_ref(&self) -> &R { &self.inner }
    pub fn into_inner(self) -> R { self.inner }
}

impl<R: AsyncRead + Unpin> AsyncRead for RequestCapture<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            this.tap.observe(&buf.filled()[before..]);
        }
        poll
    }
}

// ── RequestTap ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tapped {
    buffer: CaptureBuffer,
    read: u64,
}

/// Shared view of one request's capture buffer and byte counter.
///
/// Clones observe the same state. A tap belongs to a single request; the
/// lock behind it is never contended.
#[derive(Clone, Debug, Default)]
pub struct RequestTap(Arc<Mutex<Tapped>>);

impl RequestTap {
    pub fn new(buffer: CaptureBuffer) -> Self {
        Self(Arc::new(Mutex::new(Tapped { buffer, read: 0 })))
    }

    /// Total bytes handed to the reader, captured or not.
    pub fn bytes_read(&self) -> u64 {
        self.0.lock().read
    }

    /// Copy of the bytes captured so far.
    pub fn captured(&self) -> Bytes {
        Bytes::copy_from_slice(self.0.lock().buffer.as_bytes())
    }

    pub fn captured_len(&self) -> usize {
        self.0.lock().buffer.len()
    }

    pub fn to_string_lossy(&self) -> String {
        self.0.lock().buffer.to_string_lossy()
    }

    fn observe(&self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        let mut tapped = self.0.lock();
        tapped.buffer.observe(chunk);
        tapped.read += chunk.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::*;
    use tokio::io::AsyncReadExt;

    /// Yields its chunks one per read, then fails.
    struct Chunks {
        chunks: Vec<&'static [u8]>,
        fail_at_end: bool,
    }

    impl AsyncRead for Chunks {
        fn poll_read(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if this.chunks.is_empty() {
                if this.fail_at_end {
                    return Poll::Ready(Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated")));
                }
                return Poll::Ready(Ok(()));
            }
            let chunk = this.chunks.remove(0);
            buf.put_slice(chunk);
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn reader_sees_original_bytes_and_buffer_is_capped() {
        let source: &[u8] = b"the quick brown fox";
        let mut capture = RequestCapture::new(source, CaptureBuffer::new(9));

        let mut out = Vec::new();
        capture.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"the quick brown fox");
        assert_eq!(capture.bytes_read(), 19);
        assert_eq!(&capture.tap().captured()[..], b"the quick");
    }

    #[tokio::test]
    async fn read_straddling_capacity_fills_buffer() {
        let source = Chunks { chunks: vec![&b"12345678"[..], &b"abcde"[..]], fail_at_end: false };
        let mut capture = RequestCapture::new(source, CaptureBuffer::new(10));

        let mut out = Vec::new();
        capture.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"12345678abcde");
        assert_eq!(capture.tap().captured_len(), 10);
        assert_eq!(capture.tap().to_string_lossy(), "12345678ab");
        assert_eq!(capture.bytes_read(), 13);
    }

    #[tokio::test]
    async fn errors_pass_through_unchanged() {
        let source = Chunks { chunks: vec![&b"partial"[..]], fail_at_end: true };
        let mut capture = RequestCapture::new(source, CaptureBuffer::new(64));
        let tap = capture.tap();

        let mut out = Vec::new();
        let err = capture.read_to_end(&mut out).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        assert_eq!(err.to_string(), "truncated");
        assert_eq!(out, b"partial");
        assert_eq!(tap.bytes_read(), 7);
        assert_eq!(&tap.captured()[..], b"partial");
    }

    #[tokio::test]
    async fn disabled_capture_only_counts() {
        let payload = vec![9u8; 70_000];
        let source: &[u8] = &payload;
        let mut capture = RequestCapture::new(source, CaptureBuffer::disabled());
        let tap = capture.tap();

        let mut out = Vec::new();
        capture.read_to_end(&mut out).await.unwrap();
        drop(capture);

        assert_eq!(out.len(), 70_000);
        assert_eq!(tap.bytes_read(), 70_000);
        assert_eq!(tap.captured_len(), 0);
    }
}
