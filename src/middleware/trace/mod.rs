//! Per-request structured logging.
//!
//! [`RequestLogger`] wraps the request body and the response sink in bounded
//! captures, runs the handler once, and emits one [`Record`] per request at a
//! level picked from the response status.
//!
//! ```rust,no_run
//! use reqlog::middleware::trace::{Config, RequestLogger, filter};
//! use reqlog::{Request, Response, Router, Server};
//! use http::Method;
//!
//! # async fn get_user(_: Request) -> Response { Response::text("") }
//! # async fn run() {
//! let logger = RequestLogger::new(
//!     Config::default()
//!         .with_request_body(true)
//!         .with_response_body(true)
//!         .filter(filter::ignore_path(["/healthz"])),
//! );
//!
//! let app = Router::new()
//!     .on(Method::GET, "/users/{id}", get_user)
//!     .layer(logger);
//!
//! Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! # }
//! ```
//!
//! Record layout, in order: `id`, `trace_id`, `span_id`, then a `request`
//! group, a `response` group and finally whatever the handler attached with
//! [`add_attribute`].

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use http::header::{REFERER, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::{Level, trace};
use uuid::Uuid;

use crate::body::Body;
use crate::capture::{CaptureBuffer, RequestCapture, RequestTap, ResponseCapture};
use crate::handler::Next;
use crate::request::Request;
use crate::response::ResponseHead;
use crate::sink::ResponseSink;

mod config;
mod context;
mod emit;
pub mod filter;
mod record;
mod traceparent;

pub use config::{Config, DEFAULT_BODY_MAX_SIZE, HIDDEN_HEADERS, Levels, TraceExtractor};
pub use context::{RequestContext, add_attribute, record_error, request_id};
pub use emit::{Emit, TracingEmitter};
pub use filter::{Exchange, Filter};
pub use record::{Attr, Record, Value};
pub use traceparent::{TRACEPARENT, TraceParent};

use config::is_hidden;
use context::error_summary;

/// Header carrying the request identifier, inbound and outbound.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MESSAGE: &str = "Incoming request";

/// Request logging middleware. Install with [`Router::layer`](crate::Router::layer).
pub struct RequestLogger {
    config: Config,
    emitter: Arc<dyn Emit>,
}

impl RequestLogger {
    /// A logger that emits through `tracing` (target `reqlog`).
    pub fn new(config: Config) -> Self {
        Self::with_emitter(TracingEmitter, config)
    }

    pub fn with_emitter(emitter: impl Emit + 'static, config: Config) -> Self {
        Self { config, emitter: Arc::new(emitter) }
    }

    /// Runs `next` for `req`, renders its body into `sink` and emits the
    /// request's record.
    ///
    /// Errors are the sink's. A failed render is still logged, as a `500`
    /// carrying the error in its message.
    pub async fn serve<S>(&self, mut req: Request, next: Next, sink: &mut S) -> io::Result<ResponseHead>
    where
        S: ResponseSink + ?Sized,
    {
        let config = &self.config;
        let start = Instant::now();
        let started_at = Utc::now();

        // ── Setup ──
        let ctx = RequestContext::new();
        let request_id = config.with_request_id.then(|| {
            inbound_request_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().to_string())
        });
        if let Some(id) = &request_id {
            ctx.set_request_id(id.clone());
        }
        let trace = if config.with_trace_id || config.with_span_id {
            (config.trace_extractor)(req.headers())
        } else {
            None
        };
        if let Some(parent) = &trace {
            ctx.set_trace(parent.clone());
        }
        req.extensions_mut().insert(ctx.clone());

        let tap = RequestTap::new(CaptureBuffer::enabled_if(
            config.with_request_body,
            config.request_body_max_size,
        ));
        let body = req.replace_body(Body::empty());
        req.replace_body(Body::new(RequestCapture::with_tap(body, tap.clone())));

        let method = req.method().clone();
        let uri = req.uri().clone();
        let request_headers = req.headers().clone();
        let route = req.route.clone();
        let mut params: Vec<(String, String)> = req.params.clone().into_iter().collect();
        params.sort();
        let client_ip = client_ip(&request_headers, req.remote_addr());

        // ── Dispatch ──
        let (mut head, body) = next.run(req).await.into_parts();
        if let Some(id) = &request_id {
            let name = HeaderName::from_static(REQUEST_ID_HEADER);
            if !head.headers.contains_key(&name) {
                if let Ok(value) = HeaderValue::from_str(id) {
                    head.headers.insert(name, value);
                }
            }
        }

        let mut capture = ResponseCapture::new(
            &mut *sink,
            CaptureBuffer::enabled_if(config.with_response_body, config.response_body_max_size),
        );
        let rendered = body.write_to(&mut capture).await;
        let (_, response_body, response_length) = capture.into_parts();

        // ── Finalize ──
        let latency = start.elapsed();
        let finished_at = Utc::now();
        let status = match &rendered {
            Ok(_) => head.status,
            Err(e) => {
                ctx.record_error(e);
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let exchange = Exchange {
            method: &method,
            uri: &uri,
            route: route.as_deref(),
            request_headers: &request_headers,
            status,
            response_headers: &head.headers,
            latency,
            request_id: request_id.as_deref(),
            client_ip,
        };
        if !config.filters.iter().all(|keep| keep(&exchange)) {
            trace!(target: "reqlog", method = %method, path = uri.path(), "record suppressed by filter");
            return rendered.map(|_| head);
        }

        let mut record = Record::new();
        if let Some(id) = &request_id {
            record.push(Attr::new("id", id.as_str()));
        }
        if let Some(parent) = &trace {
            if config.with_trace_id {
                record.push(Attr::new("trace_id", parent.trace_id.as_str()));
            }
            if config.with_span_id {
                record.push(Attr::new("span_id", parent.span_id.as_str()));
            }
        }

        let mut request = vec![
            Attr::new("time", started_at),
            Attr::new("method", method.as_str()),
            Attr::new("host", exchange.host().unwrap_or_default()),
            Attr::new("path", uri.path()),
            Attr::new("query", uri.query().unwrap_or_default()),
            Attr::group("params", params.into_iter().map(|(k, v)| Attr::new(k, v)).collect()),
            Attr::new("route", route.as_deref().unwrap_or_default()),
            Attr::new("ip", client_ip.map(|ip| ip.to_string()).unwrap_or_default()),
            Attr::new("referer", header_str(&request_headers, REFERER)),
            Attr::new("length", tap.bytes_read()),
        ];
        if config.with_user_agent {
            request.push(Attr::new("user-agent", header_str(&request_headers, USER_AGENT)));
        }
        if config.with_request_body {
            request.push(Attr::new("body", tap.to_string_lossy()));
        }
        if config.with_request_header {
            request.push(Attr::group("header", visible_headers(&request_headers)));
        }
        record.push(Attr::group("request", request));

        let mut response = vec![
            Attr::new("time", finished_at),
            Attr::new("latency", latency),
            Attr::new("status", status.as_u16()),
            Attr::new("length", response_length),
        ];
        if config.with_response_body {
            response.push(Attr::new("body", response_body.to_string_lossy()));
        }
        if config.with_response_header {
            response.push(Attr::group("header", visible_headers(&head.headers)));
        }
        record.push(Attr::group("response", response));

        record.extend(ctx.attributes());

        let errors = ctx.errors();
        let message = if errors.is_empty() { MESSAGE.to_owned() } else { error_summary(&errors) };
        let level: Level = config.levels.for_status(status.as_u16());
        self.emitter.emit(level, &message, &record);

        rendered.map(|_| head)
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger").field("config", &self.config).finish_non_exhaustive()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn inbound_request_id(headers: &HeaderMap) -> Option<String> {
    let id = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    (!id.is_empty()).then(|| id.to_owned())
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> &str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

/// First `x-forwarded-for` hop, then `x-real-ip`, then the peer address.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let parse = |name: &str, first_hop: bool| -> Option<IpAddr> {
        let raw = headers.get(name)?.to_str().ok()?;
        let raw = if first_hop { raw.split(',').next()? } else { raw };
        raw.trim().parse().ok()
    };
    parse("x-forwarded-for", true)
        .or_else(|| parse("x-real-ip", false))
        .or_else(|| peer.map(|addr| addr.ip()))
}

/// One attribute per header name, values in arrival order. Names in
/// [`HIDDEN_HEADERS`] never appear.
fn visible_headers(headers: &HeaderMap) -> Vec<Attr> {
    headers
        .keys()
        .filter(|name| !is_hidden(name))
        .map(|name| {
            let values: Vec<String> = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();
            Attr::new(name.as_str().to_owned(), values)
        })
        .collect()
}
