//! Handler trait, type erasure and the [`Next`] continuation.
//!
//! # How handlers are stored
//!
//! The router keeps handlers of different concrete types in one radix tree
//! per method, so each one is erased behind `dyn ErasedHandler`:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.on(Method::GET, "/", hello)
//! Arc::new(FnHandler(hello))                       ← stored as BoxedHandler
//!        ↓ router.handle(req, sink)
//! Next::run(req)                                   ← what middleware calls
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })
//! ```
//!
//! Middleware never sees the handler itself, only a [`Next`]. Calling
//! [`Next::run`] consumes it, so the handler runs at most once per request.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// Boxed, type-erased handler future. `Send + 'static` so tokio can move it
/// between worker threads.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any `async fn` of the shape:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of the chain after a middleware: the matched handler, or a
/// `404 Not Found` when no route matched.
pub struct Next {
    handler: Option<BoxedHandler>,
}

impl Next {
    pub(crate) fn new(handler: Option<BoxedHandler>) -> Self {
        Self { handler }
    }

    /// Wraps a handler directly, without a router.
    pub fn handler(handler: impl Handler) -> Self {
        Self::new(Some(handler.into_boxed_handler()))
    }

    /// A continuation that always answers `404 Not Found`.
    pub fn not_found() -> Self {
        Self::new(None)
    }

    /// Runs the handler. Consumes `self`: there is no way to call it twice.
    pub async fn run(self, req: Request) -> Response {
        match self.handler {
            Some(handler) => handler.call(req).await,
            None => Response::status(StatusCode::NOT_FOUND),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("matched", &self.handler.is_some()).finish()
    }
}
