//! Bounded byte accumulator shared by both capture wrappers.

use bytes::{Bytes, BytesMut};

/// Append-only byte buffer with a hard capacity.
///
/// Bytes offered past the capacity are silently dropped. A disabled buffer
/// never allocates and always reports a length of zero.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    bytes: Option<BytesMut>,
    capacity: usize,
}

impl CaptureBuffer {
    /// A buffer holding at most `capacity` bytes. A capacity of zero disables it.
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            return Self::disabled();
        }
        Self { bytes: Some(BytesMut::new()), capacity }
    }

    /// A buffer that records nothing.
    pub fn disabled() -> Self {
        Self { bytes: None, capacity: 0 }
    }

    /// `new(capacity)` when `enabled`, [`disabled`](Self::disabled) otherwise.
    pub fn enabled_if(enabled: bool, capacity: usize) -> Self {
        if enabled { Self::new(capacity) } else { Self::disabled() }
    }

    pub fn is_enabled(&self) -> bool { self.bytes.is_some() }
    pub fn capacity(&self) -> usize { self.capacity }
    pub fn len(&self) -> usize { self.bytes.as_ref().map_or(0, BytesMut::len) }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
    pub fn is_full(&self) -> bool { self.len() >= self.capacity }

    /// Appends as much of `chunk` as fits and returns how many bytes were kept.
    ///
    /// Always fills exactly to capacity: with 8 of 10 bytes used, a 5-byte
    /// chunk keeps its first 2 bytes.
    pub fn observe(&mut self, chunk: &[u8]) -> usize {
        let Some(bytes) = self.bytes.as_mut() else {
            return 0;
        };
        let room = self.capacity.saturating_sub(bytes.len());
        let kept = room.min(chunk.len());
        bytes.extend_from_slice(&chunk[..kept]);
        kept
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or_default()
    }

    pub fn freeze(self) -> Bytes {
        self.bytes.map(BytesMut::freeze).unwrap_or_default()
    }

    /// The captured bytes as text; invalid UTF-8 is replaced, not rejected.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}
