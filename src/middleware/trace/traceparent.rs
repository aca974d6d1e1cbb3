//! W3C Trace Context `traceparent` extraction.
//!
//! Format: `{version}-{trace_id}-{span_id}-{trace_flags}`
//! - version: 2 hex chars, `ff` is invalid
//! - trace_id: 32 hex chars, not all zero
//! - span_id: 16 hex chars, not all zero
//! - trace_flags: 2 hex chars, bit 0 = sampled

use http::HeaderMap;
use serde::Serialize;

pub const TRACEPARENT: &str = "traceparent";

/// Trace and span identifiers of the caller's active trace.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TraceParent {
    pub trace_id: String,
    pub span_id: String,
    pub sampled: bool,
}

impl TraceParent {
    /// Parses a `traceparent` header value. Returns `None` if malformed.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;
        // Version 00 has exactly four fields; later versions may append more.
        if version == "00" && parts.next().is_some() {
            return None;
        }

        if !is_hex(version, 2) || version.eq_ignore_ascii_case("ff") {
            return None;
        }
        if !is_hex(trace_id, 32) || is_zero(trace_id) {
            return None;
        }
        if !is_hex(span_id, 16) || is_zero(span_id) {
            return None;
        }
        if !is_hex(flags, 2) {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id: trace_id.to_ascii_lowercase(),
            span_id: span_id.to_ascii_lowercase(),
            sampled: flags & 0x01 == 0x01,
        })
    }

    /// Reads and parses the `traceparent` header.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Self::parse(headers.get(TRACEPARENT)?.to_str().ok()?)
    }
}

fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_zero(s: &str) -> bool {
    s.bytes().all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    #[test]
    fn parses_valid_header() {
        let tp = TraceParent::parse(VALID).unwrap();
        assert_eq!(tp.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(tp.span_id, "00f067aa0ba902b7");
        assert!(tp.sampled);
    }

    #[test]
    fn unsampled_flag() {
        let tp = TraceParent::parse("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00").unwrap();
        assert!(!tp.sampled);
    }

    #[test]
    fn rejects_malformed_headers() {
        for bad in [
            "",
            "garbage",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01-extra",
            "ff-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            "00-00000000000000000000000000000000-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01",
            "00-4bf92f3577b34da6a3ce929d0e0e47-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e473g-00f067aa0ba902b7-01",
        ] {
            assert_eq!(TraceParent::parse(bad), None, "{bad}");
        }
    }

    #[test]
    fn reads_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(TraceParent::from_headers(&headers), None);
        headers.insert(TRACEPARENT, VALID.parse().unwrap());
        assert!(TraceParent::from_headers(&headers).is_some());
    }

    #[test]
    fn serializes_as_plain_object() {
        let tp = TraceParent::parse(VALID).unwrap();
        assert_eq!(
            serde_json::to_value(&tp).unwrap(),
            serde_json::json!({
                "trace_id": "4bf92f3577b34da6a3ce929d0e0e4736",
                "span_id": "00f067aa0ba902b7",
                "sampled": true,
            }),
        );
    }
}
