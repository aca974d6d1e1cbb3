//! Minimal reqlog example: a few JSON endpoints behind the request logger.
//!
//! Run with:
//!   RUST_LOG=reqlog=debug,info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -H 'authorization: Bearer hidden' \
//!        -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42
//!   curl -H 'x-request-id: my-id' http://localhost:3000/healthz

use http::{Method, StatusCode};
use reqlog::middleware::trace::{self, Config, RequestLogger, filter};
use reqlog::{Request, Response, Router, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let logger = RequestLogger::new(
        Config::default()
            .with_user_agent(true)
            .with_request_body(true)
            .with_request_header(true)
            .with_response_body(true)
            .with_trace_id(true)
            .with_span_id(true)
            .filter(filter::ignore_path(["/healthz"])),
    );

    let app = Router::new()
        .on(Method::GET,    "/users/{id}", get_user)
        .on(Method::POST,   "/users",      create_user)
        .on(Method::DELETE, "/users/{id}", delete_user)
        .on(Method::GET,    "/healthz",    healthz)
        .layer(logger);

    if let Err(e) = Server::bind("0.0.0.0:3000").serve(app).await {
        tracing::error!("server error: {e}");
    }
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    trace::add_attribute(&req, "user_id", id);
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /users
//
// The body is read through the logger's capture; the record shows it too.
async fn create_user(mut req: Request) -> Response {
    let body = match req.bytes().await {
        Ok(body) => body,
        Err(e) => {
            trace::record_error(&req, e);
            return Response::status(StatusCode::BAD_REQUEST);
        }
    };
    if body.is_empty() {
        trace::record_error(&req, "empty body");
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn healthz(req: Request) -> String {
    trace::request_id(&req).unwrap_or_else(|| "ok".to_owned())
}
