//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. You register a path, you
//! get a handler. The only middleware slot is the request logger installed
//! with [`Router::layer`].

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler, Next};
use crate::middleware::trace::RequestLogger;
use crate::request::Request;
use crate::response::ResponseHead;
use crate::sink::ResponseSink;

type Route = (Arc<str>, BoxedHandler);

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve),
/// or drive it directly with [`Router::handle`]. Every builder method returns
/// `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
    logger: Option<Arc<RequestLogger>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), logger: None }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use reqlog::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let route: Route = (Arc::from(path), handler.into_boxed_handler());
        self.routes
            .entry(method)
            .or_default()
            .insert(path, route)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Installs the request logger. Every request goes through it, matched or
    /// not. A second call replaces the first logger.
    pub fn layer(mut self, logger: RequestLogger) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Routes one request and renders the response body into `sink`.
    ///
    /// Returns the response head; the body has been written and flushed by
    /// the time this resolves. Errors are the sink's.
    pub async fn handle<S>(&self, mut req: Request, sink: &mut S) -> io::Result<ResponseHead>
    where
        S: ResponseSink + ?Sized,
    {
        let next = match self.lookup(req.method(), req.path()) {
            Some((route, handler, params)) => {
                req.route = Some(route);
                req.params = params;
                Next::new(Some(handler))
            }
            None => Next::not_found(),
        };

        match &self.logger {
            Some(logger) => logger.serve(req, next, sink).await,
            None => {
                let (head, body) = next.run(req).await.into_parts();
                body.write_to(sink).await?;
                Ok(head)
            }
        }
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<str>, BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let (route, handler) = matched.value;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((Arc::clone(route), Arc::clone(handler), params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
