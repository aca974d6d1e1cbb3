use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use parking_lot::Mutex;
use reqlog::middleware::trace::{Config, RequestLogger};
use reqlog::{BodySink, Request, Response, Router};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

#[derive(Default)]
struct Fields(BTreeMap<&'static str, String>);

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name(), format!("{value:?}"));
    }
}

/// Keeps every `reqlog` event with its level and fields.
#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<(Level, BTreeMap<&'static str, String>)>>>);

impl<S: Subscriber> Layer<S> for Collect {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != "reqlog" {
            return;
        }
        let mut fields = Fields::default();
        event.record(&mut fields);
        self.0.lock().push((*event.metadata().level(), fields.0));
    }
}

async fn teapot(_req: Request) -> Response {
    Response::builder().status(http::StatusCode::IM_A_TEAPOT).text("short and stout")
}

#[tokio::test]
async fn records_are_forwarded_as_tracing_events() {
    let collect = Collect::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(collect.clone()));

    let router = Router::new()
        .on(Method::GET, "/teapot", teapot)
        .layer(RequestLogger::new(Config::default().with_response_body(true)));
    let req = Request::builder().uri("/teapot").header("x-request-id", "abc").build();
    router.handle(req, &mut BodySink::new()).await.unwrap();

    let events = collect.0.lock();
    assert_eq!(events.len(), 1);
    let (level, fields) = &events[0];
    assert_eq!(*level, Level::WARN);
    assert_eq!(fields["message"], "Incoming request");
    assert_eq!(fields["status"], "418");
    assert_eq!(fields["method"], "GET");
    assert_eq!(fields["path"], "/teapot");

    let encoded = &fields["http"];
    assert!(encoded.starts_with(r#"{"id":"abc","request":{"time":"#), "{encoded}");
    let json: serde_json::Value = serde_json::from_str(encoded).unwrap();
    assert_eq!(json["request"]["method"], "GET");
    assert_eq!(json["request"]["path"], "/teapot");
    assert_eq!(json["response"]["status"], 418);
    assert_eq!(json["response"]["body"], "short and stout");
}

#[tokio::test]
async fn suppressed_records_leave_a_trace_event_only() {
    let collect = Collect::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(collect.clone()));

    let router = Router::new()
        .on(Method::GET, "/teapot", teapot)
        .layer(RequestLogger::new(
            Config::default().filter(reqlog::middleware::trace::filter::ignore_path(["/teapot"])),
        ));
    router.handle(Request::builder().uri("/teapot").build(), &mut BodySink::new()).await.unwrap();

    let events = collect.0.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, Level::TRACE);
    assert_eq!(events[0].1["message"], "record suppressed by filter");
}
