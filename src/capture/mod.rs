//! Bounded body capture.
//!
//! Two decorators sit between the transport and the handler:
//!
//! ```text
//! transport ─▶ RequestCapture(source) ─▶ handler ─▶ ResponseCapture(sink) ─▶ transport
//!                     │                                   │
//!                     ▼                                   ▼
//!               CaptureBuffer                       CaptureBuffer
//! ```
//!
//! Both forward bytes untouched and copy at most a fixed budget of them into
//! a [`CaptureBuffer`]. Counters keep running after the buffer is full, so
//! byte totals stay exact for bodies of any size while memory stays bounded.

mod buffer;
mod request;
mod response;

pub use buffer::CaptureBuffer;
pub use request::{RequestCapture, RequestTap};
pub use response::{RELAY_WINDOW, ResponseCapture};
