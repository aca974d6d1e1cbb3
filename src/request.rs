//! Incoming HTTP request type.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use hyper::body::Incoming;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::body::{Body, BodyReader};

/// An incoming HTTP request.
///
/// The body is a stream: read it with [`Request::bytes`] or through
/// [`Request::body_mut`], which is a tokio [`AsyncRead`].
#[derive(Debug)]
pub struct Request {
    pub(crate) head: http::request::Parts,
    pub(crate) body: Body,
    pub(crate) params: HashMap<String, String>,
    pub(crate) route: Option<Arc<str>>,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl Request {
    /// Wraps an `http` request whose body is any byte source.
    pub fn from_http<R>(req: http::Request<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (head, body) = req.into_parts();
        Self {
            head,
            body: Body::new(body),
            params: HashMap::new(),
            route: None,
            remote_addr: None,
        }
    }

    pub(crate) fn from_hyper(req: hyper::Request<Incoming>, remote_addr: SocketAddr) -> Self {
        let mut req = Self::from_http(req.map(BodyReader::new));
        req.remote_addr = Some(remote_addr);
        req
    }

    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn query(&self) -> Option<&str> { self.head.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn extensions(&self) -> &Extensions { &self.head.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.head.extensions }

    /// The matched route template, e.g. `/users/{id}`.
    pub fn route(&self) -> Option<&str> { self.route.as_deref() }

    /// The peer address of the connection, not the original client behind a
    /// proxy.
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Header lookup; names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name)?.to_str().ok()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn body_mut(&mut self) -> &mut Body { &mut self.body }

    /// Replaces the body, returning the old one.
    pub fn replace_body(&mut self, body: Body) -> Body {
        std::mem::replace(&mut self.body, body)
    }

    /// Reads the rest of the body into memory.
    pub async fn bytes(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Builds requests by hand, for tests and for embedding the router without a
/// server.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Vec<u8>,
    remote_addr: Option<SocketAddr>,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// # Panics
    ///
    /// Panics if `uri` is not a valid request target.
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.parse().expect("invalid request uri");
        self
    }

    /// # Panics
    ///
    /// Panics if `name` or `value` are not valid header text.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name = HeaderName::from_bytes(name.as_bytes()).expect("invalid header name");
        let value = HeaderValue::from_str(value).expect("invalid header value");
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn build(self) -> Request {
        let mut req = http::Request::new(io::Cursor::new(self.body));
        *req.method_mut() = self.method;
        *req.uri_mut() = self.uri;
        *req.headers_mut() = self.headers;
        let mut req = Request::from_http(req);
        req.remote_addr = self.remote_addr;
        req
    }
}
