//! Capture wrapper around the outbound byte sink.

use std::io::{self, IoSlice};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::capture::CaptureBuffer;
use crate::error::RelayError;
use crate::sink::{CopyFuture, ResponseSink};

/// Window used when bulk copies are relayed through the capture.
pub const RELAY_WINDOW: usize = 32 * 1024;

/// Mirrors every byte written to an inner sink into a bounded buffer.
///
/// The inner sink always receives exactly what the caller wrote, and the
/// caller always gets the inner sink's result back untouched. Only bytes the
/// inner sink actually accepted are counted and captured, so a partial write
/// followed by a retry of the remainder is observed once.
#[derive(Debug)]
pub struct ResponseCapture<W> {
    inner: W,
    buffer: CaptureBuffer,
    written: u64,
}

impl<W> ResponseCapture<W> {
    pub fn new(inner: W, buffer: CaptureBuffer) -> Self {
        Self { inner, buffer, written: 0 }
    }

    /// Total bytes accepted by the inner sink, captured or not.
    pub fn bytes_written(&self) -> u64 { self.written }

    pub fn captured(&self) -> &[u8] { self.buffer.as_bytes() }
    pub fn buffer(&self) -> &CaptureBuffer { &self.buffer }
    pub fn get_ref(&self) -> &W { &self.inner }
    pub fn get_mut(&mut self) -> &mut W { &mut self.inner }

    /// Splits the wrapper into the inner sink, the capture buffer and the
    /// byte count.
    pub fn into_parts(self) -> (W, CaptureBuffer, u64) {
        (self.inner, self.buffer, self.written)
    }

    fn observe(&mut self, accepted: &[u8]) {
        self.buffer.observe(accepted);
        self.written += accepted.len() as u64;
    }
}

impl<W: ResponseSink> ResponseCapture<W> {
    /// Copies `reader` into the sink one window at a time through
    /// `poll_write`, so every byte passes the capture buffer.
    async fn relay(&mut self, reader: &mut (dyn AsyncRead + Unpin + Send)) -> io::Result<u64> {
        let mut window = vec![0u8; RELAY_WINDOW];
        let mut copied = 0u64;
        loop {
            let read = reader.read(&mut window).await?;
            if read == 0 {
                return Ok(copied);
            }
            let wrote = self.write(&window[..read]).await?;
            if wrote > read {
                return Err(RelayError::InvalidWrite.into());
            }
            copied += wrote as u64;
            if wrote < read {
                return Err(RelayError::ShortWrite.into());
            }
        }
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ResponseCapture<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            this.observe(&buf[..n.min(buf.len())]);
        }
        poll
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_write_vectored(cx, bufs);
        if let Poll::Ready(Ok(n)) = poll {
            let mut left = n;
            for slice in bufs {
                if left == 0 {
                    break;
                }
                let take = left.min(slice.len());
                this.observe(&slice[..take]);
                left -= take;
            }
        }
        poll
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

impl<W: ResponseSink> ResponseSink for ResponseCapture<W> {
    /// With capture off the inner sink's own bulk copy runs untouched; with
    /// capture on the copy is relayed so the buffer sees every byte.
    fn copy_from<'a>(&'a mut self, reader: &'a mut (dyn AsyncRead + Unpin + Send)) -> CopyFuture<'a> {
        if self.buffer.is_enabled() {
            return Box::pin(self.relay(reader));
        }
        Box::pin(async move {
            let copied = self.inner.copy_from(reader).await?;
            self.written += copied;
            Ok(copied)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::*;
    use crate::sink::BodySink;

    /// Accepts at most `limit` bytes per write.
    struct Trickle {
        out: Vec<u8>,
        limit: usize,
    }

    impl AsyncWrite for Trickle {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            let n = buf.len().min(this.limit);
            this.out.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl ResponseSink for Trickle {}

    /// Claims to have written more than it was given.
    struct Liar;

    impl AsyncWrite for Liar {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len() + 1))
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl ResponseSink for Liar {}

    /// Records whether its bulk-copy fast path ran.
    #[derive(Default)]
    struct FastPath {
        inner: BodySink,
        used: bool,
    }

    impl AsyncWrite for FastPath {
        fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl ResponseSink for FastPath {
        fn copy_from<'a>(&'a mut self, reader: &'a mut (dyn AsyncRead + Unpin + Send)) -> CopyFuture<'a> {
            self.used = true;
            self.inner.copy_from(reader)
        }
    }

    #[tokio::test]
    async fn sink_receives_every_byte_and_buffer_is_capped() {
        let mut capture = ResponseCapture::new(Vec::new(), CaptureBuffer::new(10));
        capture.write_all(b"hello ").await.unwrap();
        capture.write_all(b"wonderful world").await.unwrap();

        assert_eq!(capture.bytes_written(), 21);
        assert_eq!(capture.captured(), b"hello wond");
        let (sink, _, _) = capture.into_parts();
        assert_eq!(sink, b"hello wonderful world");
    }

    #[tokio::test]
    async fn write_straddling_capacity_fills_buffer_and_forwards_all() {
        let mut capture = ResponseCapture::new(Vec::new(), CaptureBuffer::new(10));
        capture.write_all(b"12345678").await.unwrap();
        let n = capture.write(b"abcde").await.unwrap();

        assert_eq!(n, 5);
        assert_eq!(capture.captured(), b"12345678ab");
        assert_eq!(capture.get_ref(), b"12345678abcde");
        assert_eq!(capture.bytes_written(), 13);
    }

    #[tokio::test]
    async fn disabled_capture_still_counts() {
        let mut capture = ResponseCapture::new(Vec::new(), CaptureBuffer::disabled());
        capture.write_all(&[1u8; 4096]).await.unwrap();

        assert_eq!(capture.buffer().len(), 0);
        assert_eq!(capture.bytes_written(), 4096);
        assert_eq!(capture.get_ref().len(), 4096);
    }

    #[tokio::test]
    async fn partial_writes_are_observed_once() {
        let sink = Trickle { out: Vec::new(), limit: 3 };
        let mut capture = ResponseCapture::new(sink, CaptureBuffer::new(64));
        capture.write_all(b"abcdefgh").await.unwrap();

        assert_eq!(capture.captured(), b"abcdefgh");
        assert_eq!(capture.bytes_written(), 8);
        assert_eq!(capture.get_ref().out, b"abcdefgh");
    }

    #[tokio::test]
    async fn vectored_writes_capture_accepted_prefix() {
        let mut capture = ResponseCapture::new(Vec::new(), CaptureBuffer::new(5));
        let slices = [IoSlice::new(b"abc"), IoSlice::new(b"defg")];
        let n = capture.write_vectored(&slices).await.unwrap();

        assert_eq!(&capture.get_ref()[..], &b"abcdefg"[..n]);
        assert_eq!(capture.bytes_written(), n as u64);
        assert_eq!(capture.captured(), &b"abcde"[..n.min(5)]);
    }

    #[tokio::test]
    async fn bulk_copy_with_capture_relays_through_buffer() {
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let mut reader: &[u8] = &payload;
        let mut capture = ResponseCapture::new(FastPath::default(), CaptureBuffer::new(1024));

        let copied = capture.copy_from(&mut reader).await.unwrap();

        assert_eq!(copied, 100_000);
        assert_eq!(capture.bytes_written(), 100_000);
        assert_eq!(capture.captured(), &payload[..1024]);
        assert!(!capture.get_ref().used);
        assert_eq!(capture.get_ref().inner.as_bytes(), &payload[..]);
    }

    #[tokio::test]
    async fn bulk_copy_without_capture_uses_sink_fast_path() {
        let mut reader: &[u8] = b"straight through";
        let mut capture = ResponseCapture::new(FastPath::default(), CaptureBuffer::disabled());

        let copied = capture.copy_from(&mut reader).await.unwrap();

        assert_eq!(copied, 16);
        assert_eq!(capture.bytes_written(), 16);
        assert!(capture.get_ref().used);
        assert_eq!(capture.get_ref().inner.as_bytes(), b"straight through");
    }

    #[tokio::test]
    async fn relay_stops_on_short_write() {
        let mut reader: &[u8] = b"0123456789";
        let sink = Trickle { out: Vec::new(), limit: 4 };
        let mut capture = ResponseCapture::new(sink, CaptureBuffer::new(64));

        let err = capture.copy_from(&mut reader).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::WriteZero);
        assert_eq!(capture.bytes_written(), 4);
        assert_eq!(capture.get_ref().out, b"0123");
    }

    #[tokio::test]
    async fn relay_rejects_overreported_write() {
        let mut reader: &[u8] = b"abc";
        let mut capture = ResponseCapture::new(Liar, CaptureBuffer::new(64));

        let err = capture.copy_from(&mut reader).await.unwrap_err();
        let relay = err.get_ref().and_then(|e| e.downcast_ref::<RelayError>());
        assert_eq!(relay, Some(&RelayError::InvalidWrite));
    }

    #[tokio::test]
    async fn relay_propagates_source_errors() {
        struct Broken;
        impl AsyncRead for Broken {
            fn poll_read(
                self: Pin<&mut Self>,
                _: &mut Context<'_>,
                _: &mut tokio::io::ReadBuf<'_>,
            ) -> Poll<io::Result<()>> {
                Poll::Ready(Err(io::Error::new(ErrorKind::ConnectionReset, "reset")))
            }
        }

        let mut capture = ResponseCapture::new(Vec::new(), CaptureBuffer::new(64));
        let err = capture.copy_from(&mut Broken).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionReset);
        assert_eq!(capture.bytes_written(), 0);
    }
}
