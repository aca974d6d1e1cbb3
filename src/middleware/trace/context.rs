//! Per-request scratch state shared between the logger and the handler.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::middleware::trace::record::{Attr, Value};
use crate::middleware::trace::traceparent::TraceParent;
use crate::request::Request;

#[derive(Debug, Default)]
struct State {
    request_id: Option<String>,
    trace: Option<TraceParent>,
    attributes: Vec<Attr>,
    errors: Vec<String>,
}

/// Handle onto one request's logging state.
///
/// The logger inserts it into the request's extensions before the handler
/// runs and reads it back once the handler returns. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct RequestContext(Arc<Mutex<State>>);

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_id(&self) -> Option<String> {
        self.0.lock().request_id.clone()
    }

    pub(crate) fn set_request_id(&self, id: String) {
        self.0.lock().request_id = Some(id);
    }

    pub fn trace(&self) -> Option<TraceParent> {
        self.0.lock().trace.clone()
    }

    pub(crate) fn set_trace(&self, trace: TraceParent) {
        self.0.lock().trace = Some(trace);
    }

    /// Appends an attribute to the request's eventual log record.
    pub fn add_attribute(&self, attr: Attr) {
        self.0.lock().attributes.push(attr);
    }

    /// Records a handler error. Any recorded error turns the record's message
    /// into an error summary.
    pub fn record_error(&self, err: impl fmt::Display) {
        self.0.lock().errors.push(err.to_string());
    }

    pub fn attributes(&self) -> Vec<Attr> {
        self.0.lock().attributes.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.0.lock().errors.clone()
    }
}

/// The current request's identifier, if the logger assigned one.
pub fn request_id(req: &Request) -> Option<String> {
    req.extensions().get::<RequestContext>()?.request_id()
}

/// Attaches `key = value` to the current request's log record.
///
/// Attributes appear after the built-in fields, in the order they were added.
/// A no-op when no logger is installed.
pub fn add_attribute(req: &Request, key: &'static str, value: impl Into<Value>) {
    if let Some(ctx) = req.extensions().get::<RequestContext>() {
        ctx.add_attribute(Attr::new(key, value));
    }
}

/// Records an error against the current request. A no-op when no logger is
/// installed.
pub fn record_error(req: &Request, err: impl fmt::Display) {
    if let Some(ctx) = req.extensions().get::<RequestContext>() {
        ctx.record_error(err);
    }
}

/// Renders recorded errors one per line, numbered from 1.
pub(crate) fn error_summary(errors: &[String]) -> String {
    errors.iter()
        .enumerate()
        .map(|(i, e)| format!("Error #{:02}: {e}\n", i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_keep_attachment_order() {
        let ctx = RequestContext::new();
        ctx.add_attribute(Attr::new("first", 1i64));
        ctx.clone().add_attribute(Attr::new("second", "two"));

        let keys: Vec<_> = ctx.attributes().into_iter().map(|a| a.key).collect();
        assert_eq!(keys, ["first", "second"]);
    }

    #[test]
    fn missing_request_id_is_none() {
        let req = Request::builder().build();
        assert_eq!(request_id(&req), None);
        add_attribute(&req, "ignored", "value");
        record_error(&req, "ignored");
    }

    #[test]
    fn error_summary_numbers_errors() {
        let errors = vec!["db timeout".to_owned(), "cache miss".to_owned()];
        assert_eq!(error_summary(&errors), "Error #01: db timeout\nError #02: cache miss\n");
    }
}
