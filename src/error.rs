//! Error types.

use std::fmt;
use std::io;

/// The error type returned by the server's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding to a port or accepting a connection.
#[derive(Debug)]
pub struct Error(io::Error);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self(e)
    }
}

/// A sink misbehaved while a bulk copy was relayed through a capture.
///
/// Surfaces wrapped in an [`io::Error`]; recover it with
/// `err.get_ref().and_then(|e| e.downcast_ref::<RelayError>())`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelayError {
    /// The sink reported more bytes written than it was handed.
    InvalidWrite,
    /// The sink accepted fewer bytes than it was handed, possibly none.
    ShortWrite,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWrite => f.write_str("invalid write result"),
            Self::ShortWrite   => f.write_str("short write"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<RelayError> for io::Error {
    fn from(e: RelayError) -> Self {
        let kind = match e {
            RelayError::InvalidWrite => io::ErrorKind::Other,
            RelayError::ShortWrite   => io::ErrorKind::WriteZero,
        };
        io::Error::new(kind, e)
    }
}
