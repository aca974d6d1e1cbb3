//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! You should not need to think about this module directly. Build a [`Response`]
//! in your handler and return it. That is the entire job description.

use std::fmt;
use std::io;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::warn;

use crate::sink::ResponseSink;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── ResponseBody ──────────────────────────────────────────────────────────────

/// What a handler hands back to be written to the client.
#[derive(Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Bytes(Bytes),
    /// Streamed from a reader at render time, through the sink's bulk copy.
    Reader(Box<dyn AsyncRead + Unpin + Send>),
}

impl ResponseBody {
    /// Writes the body into `sink` and flushes it. Returns the bytes written.
    pub async fn write_to<S>(self, sink: &mut S) -> io::Result<u64>
    where
        S: ResponseSink + ?Sized,
    {
        let written = match self {
            Self::Empty => 0,
            Self::Bytes(bytes) => {
                sink.write_all(&bytes).await?;
                bytes.len() as u64
            }
            Self::Reader(mut reader) => sink.copy_from(&mut *reader).await?,
        };
        sink.flush().await?;
        Ok(written)
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Reader(_) => f.write_str("Reader"),
        }
    }
}

// ── ResponseHead ──────────────────────────────────────────────────────────────

/// Status and headers of a response whose body has already been rendered.
#[derive(Clone, Debug, Default)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseHead {
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new() }
    }

    pub(crate) fn into_http(self, body: Bytes) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use reqlog::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use reqlog::{ContentType, Response};
/// use http::StatusCode;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
///
/// Response::builder()
///     .bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) head: ResponseHead,
    pub(crate) body: ResponseBody,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { head: ResponseHead::new(StatusCode::OK) }
    }

    pub fn status_code(&self) -> StatusCode { self.head.status }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.head.headers }

    pub fn into_parts(self) -> (ResponseHead, ResponseBody) {
        (self.head, self.body)
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a body method.
pub struct ResponseBuilder {
    head: ResponseHead,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.head.status = code;
        self
    }

    /// Appends a header. Names or values that are not valid header text are
    /// dropped with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.head.headers.append(name, value);
            }
            _ => warn!(header = name, "dropping invalid response header"),
        }
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(ContentType::Json, ResponseBody::Bytes(body.into()))
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, ResponseBody::Bytes(body.into().into()))
    }

    /// Terminate with a typed body. Use this for XML, HTML, binary, SSE, etc.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type, ResponseBody::Bytes(body.into()))
    }

    /// Terminate with a body streamed from `reader` when the response is sent.
    pub fn stream(
        self,
        content_type: ContentType,
        reader: impl AsyncRead + Unpin + Send + 'static,
    ) -> Response {
        self.finish(content_type, ResponseBody::Reader(Box::new(reader)))
    }

    /// Terminate with no body (e.g. `204 No Content`, `301 Moved Permanently`).
    pub fn no_body(self) -> Response {
        Response { head: self.head, body: ResponseBody::Empty }
    }

    fn finish(mut self, content_type: ContentType, body: ResponseBody) -> Response {
        self.head.headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(content_type.as_str()));
        Response { head: self.head, body }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}
