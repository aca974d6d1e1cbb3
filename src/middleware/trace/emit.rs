//! Where finished records go.

use tracing::Level;

use crate::middleware::trace::record::Record;

/// Receives one record per logged request.
pub trait Emit: Send + Sync {
    fn emit(&self, level: Level, message: &str, record: &Record);
}

impl<F> Emit for F
where
    F: Fn(Level, &str, &Record) + Send + Sync,
{
    fn emit(&self, level: Level, message: &str, record: &Record) {
        self(level, message, record)
    }
}

/// Forwards records to `tracing` as events with target `reqlog`.
///
/// Status, method and path are separate fields so subscribers can filter on
/// them; the whole record is encoded as JSON into `http`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEmitter;

impl Emit for TracingEmitter {
    fn emit(&self, level: Level, message: &str, record: &Record) {
        let status = record.get("response.status").and_then(|v| v.as_u64()).unwrap_or_default();
        let method = record.get("request.method").and_then(|v| v.as_str()).unwrap_or_default();
        let path = record.get("request.path").and_then(|v| v.as_str()).unwrap_or_default();
        let http = serde_json::to_string(record).unwrap_or_default();

        // `event!` needs a constant level.
        macro_rules! emit_at {
            ($lvl:expr) => {
                tracing::event!(target: "reqlog", $lvl, status, method, path, http = %http, "{message}")
            };
        }
        match level {
            Level::ERROR => emit_at!(Level::ERROR),
            Level::WARN => emit_at!(Level::WARN),
            Level::INFO => emit_at!(Level::INFO),
            Level::DEBUG => emit_at!(Level::DEBUG),
            _ => emit_at!(Level::TRACE),
        }
    }
}
