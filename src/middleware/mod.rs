//! Middleware layer.
//!
//! Middleware sits between the router and the matched handler and sees every
//! request, matched or not. It receives the request, a [`Next`](crate::Next)
//! continuation and the response sink, and is responsible for running the
//! continuation and rendering its response.
//!
//! Built-in middleware:
//! - [`trace`]: per-request record with method, path, status, latency and
//!   optional captured bodies and headers

pub mod trace;
