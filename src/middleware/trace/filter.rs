//! Post-completion filters deciding whether a request is logged.
//!
//! A [`Filter`] returns `true` to keep the record. Filters run in order and
//! stop at the first `false`.
//!
//! ```rust
//! use reqlog::middleware::trace::{Config, filter};
//!
//! let config = Config::default()
//!     .filter(filter::ignore_path(["/healthz", "/readyz"]))
//!     .filter(filter::ignore_status_range(300, 399));
//! ```

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode, Uri};

/// Completed request/response pair, as seen by filters.
#[derive(Debug)]
pub struct Exchange<'a> {
    pub(crate) method: &'a Method,
    pub(crate) uri: &'a Uri,
    pub(crate) route: Option<&'a str>,
    pub(crate) request_headers: &'a HeaderMap,
    pub(crate) status: StatusCode,
    pub(crate) response_headers: &'a HeaderMap,
    pub(crate) latency: Duration,
    pub(crate) request_id: Option<&'a str>,
    pub(crate) client_ip: Option<IpAddr>,
}

impl Exchange<'_> {
    pub fn method(&self) -> &Method { self.method }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn route(&self) -> Option<&str> { self.route }
    pub fn status(&self) -> StatusCode { self.status }
    pub fn request_headers(&self) -> &HeaderMap { self.request_headers }
    pub fn response_headers(&self) -> &HeaderMap { self.response_headers }
    pub fn latency(&self) -> Duration { self.latency }
    pub fn request_id(&self) -> Option<&str> { self.request_id }
    pub fn client_ip(&self) -> Option<IpAddr> { self.client_ip }

    /// `Host` header, falling back to the URI authority.
    pub fn host(&self) -> Option<&str> {
        self.request_headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri.host())
    }
}

/// A post-completion predicate. `false` suppresses the record.
pub type Filter = Arc<dyn Fn(&Exchange<'_>) -> bool + Send + Sync>;

/// Keeps requests matching `predicate`.
pub fn accept(predicate: impl Fn(&Exchange<'_>) -> bool + Send + Sync + 'static) -> Filter {
    Arc::new(predicate)
}

/// Drops requests matching `predicate`.
pub fn ignore(predicate: impl Fn(&Exchange<'_>) -> bool + Send + Sync + 'static) -> Filter {
    Arc::new(move |ex: &Exchange<'_>| !predicate(ex))
}

// ── Method ────────────────────────────────────────────────────────────────────

pub fn accept_method(methods: impl IntoIterator<Item = Method>) -> Filter {
    let methods: Vec<Method> = methods.into_iter().collect();
    accept(move |ex| methods.contains(ex.method()))
}

pub fn ignore_method(methods: impl IntoIterator<Item = Method>) -> Filter {
    let methods: Vec<Method> = methods.into_iter().collect();
    ignore(move |ex| methods.contains(ex.method()))
}

// ── Status ────────────────────────────────────────────────────────────────────

pub fn accept_status(statuses: impl IntoIterator<Item = u16>) -> Filter {
    let statuses: Vec<u16> = statuses.into_iter().collect();
    accept(move |ex| statuses.contains(&ex.status().as_u16()))
}

pub fn ignore_status(statuses: impl IntoIterator<Item = u16>) -> Filter {
    let statuses: Vec<u16> = statuses.into_iter().collect();
    ignore(move |ex| statuses.contains(&ex.status().as_u16()))
}

/// Keeps statuses in `low..=high`.
pub fn accept_status_range(low: u16, high: u16) -> Filter {
    accept(move |ex| (low..=high).contains(&ex.status().as_u16()))
}

/// Drops statuses in `low..=high`.
pub fn ignore_status_range(low: u16, high: u16) -> Filter {
    ignore(move |ex| (low..=high).contains(&ex.status().as_u16()))
}

// ── Path ──────────────────────────────────────────────────────────────────────

fn owned(items: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    items.into_iter().map(Into::into).collect()
}

pub fn accept_path(paths: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let paths = owned(paths);
    accept(move |ex| paths.iter().any(|p| p == ex.path()))
}

pub fn ignore_path(paths: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let paths = owned(paths);
    ignore(move |ex| paths.iter().any(|p| p == ex.path()))
}

pub fn accept_path_prefix(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let prefixes = owned(prefixes);
    accept(move |ex| prefixes.iter().any(|p| ex.path().starts_with(p.as_str())))
}

pub fn ignore_path_prefix(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let prefixes = owned(prefixes);
    ignore(move |ex| prefixes.iter().any(|p| ex.path().starts_with(p.as_str())))
}

pub fn accept_path_suffix(suffixes: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let suffixes = owned(suffixes);
    accept(move |ex| suffixes.iter().any(|s| ex.path().ends_with(s.as_str())))
}

pub fn ignore_path_suffix(suffixes: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let suffixes = owned(suffixes);
    ignore(move |ex| suffixes.iter().any(|s| ex.path().ends_with(s.as_str())))
}

pub fn accept_path_contains(parts: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let parts = owned(parts);
    accept(move |ex| parts.iter().any(|p| ex.path().contains(p.as_str())))
}

pub fn ignore_path_contains(parts: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let parts = owned(parts);
    ignore(move |ex| parts.iter().any(|p| ex.path().contains(p.as_str())))
}

// ── Host ──────────────────────────────────────────────────────────────────────

pub fn accept_host(hosts: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let hosts = owned(hosts);
    accept(move |ex| ex.host().is_some_and(|h| hosts.iter().any(|x| x.eq_ignore_ascii_case(h))))
}

pub fn ignore_host(hosts: impl IntoIterator<Item = impl Into<String>>) -> Filter {
    let hosts = owned(hosts);
    ignore(move |ex| ex.host().is_some_and(|h| hosts.iter().any(|x| x.eq_ignore_ascii_case(h))))
}
