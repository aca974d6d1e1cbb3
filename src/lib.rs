//! # reqlog
//!
//! Request logging for hyper services behind a reverse proxy: one structured
//! record per request, with bounded capture of request and response bodies.
//!
//! ## The contract
//!
//! A body of any size costs at most a fixed number of captured bytes. The
//! handler reads exactly the bytes the client sent and the client receives
//! exactly the bytes the handler wrote. Byte counts stay exact past the
//! capture limit.
//!
//! - Bounded capture: [`capture::RequestCapture`], [`capture::ResponseCapture`]
//! - Per-request records: [`middleware::trace::RequestLogger`]
//! - Routing and serving: [`Router`] (radix tree via [`matchit`]) and [`Server`]
//!   (hyper, HTTP/1.1 + HTTP/2, graceful shutdown)
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use reqlog::middleware::trace::{self, Config, RequestLogger};
//! use reqlog::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .on(Method::GET,  "/users/{id}", get_user)
//!         .on(Method::POST, "/users",      create_user)
//!         .layer(RequestLogger::new(Config::default().with_request_body(true)));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     trace::add_attribute(&req, "user_id", id);
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(mut req: Request) -> Response {
//!     match req.bytes().await {
//!         Ok(body) if !body.is_empty() => Response::builder()
//!             .status(StatusCode::CREATED)
//!             .header("location", "/users/99")
//!             .json(body),
//!         _ => Response::status(StatusCode::BAD_REQUEST),
//!     }
//! }
//! ```

mod body;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod capture;
pub mod middleware;
pub mod sink;

pub use body::{Body, BodyReader};
pub use error::{Error, RelayError};
pub use handler::{Handler, Next};
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, IntoResponse, Response, ResponseBody, ResponseBuilder, ResponseHead};
pub use router::Router;
pub use server::Server;
pub use sink::{BodySink, ResponseSink};
