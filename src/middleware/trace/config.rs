//! Request logger configuration.

use std::fmt;

use http::{HeaderMap, HeaderName};
use tracing::Level;

use crate::middleware::trace::filter::Filter;
use crate::middleware::trace::traceparent::TraceParent;

/// Default capture budget per body.
pub const DEFAULT_BODY_MAX_SIZE: usize = 64 * 1024;

/// Headers never copied into a record, request or response side.
pub const HIDDEN_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "proxy-authorization",
    "set-cookie",
    "x-auth-token",
    "x-csrf-token",
    "x-xsrf-token",
];

pub(crate) fn is_hidden(name: &HeaderName) -> bool {
    HIDDEN_HEADERS.contains(&name.as_str())
}

/// Log levels per status-code band.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Levels {
    pub default: Level,
    pub client_error: Level,
    pub server_error: Level,
}

impl Levels {
    /// 400–499 → `client_error`, 500–599 → `server_error`, anything else →
    /// `default`.
    pub fn for_status(&self, status: u16) -> Level {
        match status {
            400..=499 => self.client_error,
            500..=599 => self.server_error,
            _ => self.default,
        }
    }
}

impl Default for Levels {
    fn default() -> Self {
        Self { default: Level::INFO, client_error: Level::WARN, server_error: Level::ERROR }
    }
}

/// Pulls the caller's trace context out of the request headers.
pub type TraceExtractor = fn(&HeaderMap) -> Option<TraceParent>;

/// What the request logger captures and how it grades requests.
///
/// Built by chaining from [`Config::default`]:
///
/// ```rust
/// use reqlog::middleware::trace::{Config, filter};
/// use http::Method;
///
/// let config = Config::default()
///     .with_request_body(true)
///     .with_response_body(true)
///     .response_body_max_size(4096)
///     .filter(filter::ignore_method([Method::OPTIONS]));
/// ```
#[derive(Clone)]
pub struct Config {
    pub(crate) levels: Levels,
    pub(crate) request_body_max_size: usize,
    pub(crate) response_body_max_size: usize,
    pub(crate) with_user_agent: bool,
    pub(crate) with_request_id: bool,
    pub(crate) with_request_body: bool,
    pub(crate) with_request_header: bool,
    pub(crate) with_response_body: bool,
    pub(crate) with_response_header: bool,
    pub(crate) with_trace_id: bool,
    pub(crate) with_span_id: bool,
    pub(crate) filters: Vec<Filter>,
    pub(crate) trace_extractor: TraceExtractor,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            levels: Levels::default(),
            request_body_max_size: DEFAULT_BODY_MAX_SIZE,
            response_body_max_size: DEFAULT_BODY_MAX_SIZE,
            with_user_agent: false,
            with_request_id: true,
            with_request_body: false,
            with_request_header: false,
            with_response_body: false,
            with_response_header: false,
            with_trace_id: false,
            with_span_id: false,
            filters: Vec::new(),
            trace_extractor: TraceParent::from_headers,
        }
    }
}

impl Config {
    pub fn levels(mut self, levels: Levels) -> Self {
        self.levels = levels;
        self
    }

    pub fn default_level(mut self, level: Level) -> Self {
        self.levels.default = level;
        self
    }

    pub fn client_error_level(mut self, level: Level) -> Self {
        self.levels.client_error = level;
        self
    }

    pub fn server_error_level(mut self, level: Level) -> Self {
        self.levels.server_error = level;
        self
    }

    /// Maximum request body bytes kept in the record. Zero disables capture.
    pub fn request_body_max_size(mut self, bytes: usize) -> Self {
        self.request_body_max_size = bytes;
        self
    }

    /// Maximum response body bytes kept in the record. Zero disables capture.
    pub fn response_body_max_size(mut self, bytes: usize) -> Self {
        self.response_body_max_size = bytes;
        self
    }

    pub fn with_user_agent(mut self, on: bool) -> Self {
        self.with_user_agent = on;
        self
    }

    pub fn with_request_id(mut self, on: bool) -> Self {
        self.with_request_id = on;
        self
    }

    pub fn with_request_body(mut self, on: bool) -> Self {
        self.with_request_body = on;
        self
    }

    pub fn with_request_header(mut self, on: bool) -> Self {
        self.with_request_header = on;
        self
    }

    pub fn with_response_body(mut self, on: bool) -> Self {
        self.with_response_body = on;
        self
    }

    pub fn with_response_header(mut self, on: bool) -> Self {
        self.with_response_header = on;
        self
    }

    pub fn with_trace_id(mut self, on: bool) -> Self {
        self.with_trace_id = on;
        self
    }

    pub fn with_span_id(mut self, on: bool) -> Self {
        self.with_span_id = on;
        self
    }

    /// Appends a filter. Filters run in the order added; the first one to
    /// return `false` suppresses the record.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Replaces the default `traceparent` header parser.
    pub fn trace_extractor(mut self, extractor: TraceExtractor) -> Self {
        self.trace_extractor = extractor;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("levels", &self.levels)
            .field("request_body_max_size", &self.request_body_max_size)
            .field("response_body_max_size", &self.response_body_max_size)
            .field("with_user_agent", &self.with_user_agent)
            .field("with_request_id", &self.with_request_id)
            .field("with_request_body", &self.with_request_body)
            .field("with_request_header", &self.with_request_header)
            .field("with_response_body", &self.with_response_body)
            .field("with_response_header", &self.with_response_header)
            .field("with_trace_id", &self.with_trace_id)
            .field("with_span_id", &self.with_span_id)
            .field("filters", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bands_map_to_levels() {
        let levels = Levels::default();
        for status in 100..400 {
            assert_eq!(levels.for_status(status), Level::INFO, "{status}");
        }
        for status in 400..500 {
            assert_eq!(levels.for_status(status), Level::WARN, "{status}");
        }
        for status in 500..600 {
            assert_eq!(levels.for_status(status), Level::ERROR, "{status}");
        }
    }

    #[test]
    fn custom_levels_are_used() {
        let config = Config::default()
            .default_level(Level::DEBUG)
            .client_error_level(Level::INFO)
            .server_error_level(Level::WARN);
        assert_eq!(config.levels.for_status(204), Level::DEBUG);
        assert_eq!(config.levels.for_status(404), Level::INFO);
        assert_eq!(config.levels.for_status(503), Level::WARN);
    }

    #[test]
    fn hidden_headers_match_case_insensitively() {
        assert!(is_hidden(&HeaderName::from_static("authorization")));
        assert!(is_hidden(&HeaderName::from_bytes(b"Set-Cookie").unwrap()));
        assert!(!is_hidden(&HeaderName::from_static("accept")));
    }

    #[test]
    fn defaults_capture_only_the_request_id() {
        let config = Config::default();
        assert!(config.with_request_id);
        assert!(!config.with_request_body && !config.with_response_body);
        assert!(!config.with_request_header && !config.with_response_header);
        assert_eq!(config.request_body_max_size, DEFAULT_BODY_MAX_SIZE);
    }
}
