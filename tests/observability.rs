mod common;

use common::{ok, send};
use futures::executor::block_on;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;
use weft::middleware::{Metrics, RequestTracing};
use weft::{Method, Request, Server};

fn get(target: &str) -> Request {
    Request::new(Method::GET, target)
}

fn app() -> Server {
    let mut server = Server::new();
    server.middleware(Metrics::default()).middleware(RequestTracing);
    server.get("/items/:item", ok);
    server.post("/items", |ctx| {
        Box::pin(async move {
            ctx.text(201, "created");
        })
    });
    server
}

/// Finds the rendered sample `name{..}` carrying every label in `labels`.
fn sample<'a>(rendered: &'a str, name: &str, labels: &[&str]) -> Option<&'a str> {
    rendered.lines().find(|line| {
        line.starts_with(&format!("{name}{{")) && labels.iter().all(|label| line.contains(label))
    })
}

#[test]
fn requests_are_counted_and_timed_per_route() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let server = app();

    metrics::with_local_recorder(&recorder, || {
        block_on(async {
            assert_eq!(send(&server, get("/items/1")).await.status, 200);
            assert_eq!(send(&server, get("/items/2")).await.status, 200);
            assert_eq!(send(&server, Request::new(Method::POST, "/items")).await.status, 201);
            assert_eq!(send(&server, get("/nowhere")).await.status, 404);
        })
    });

    let rendered = handle.render();
    let hits = sample(
        &rendered,
        "http_requests_total",
        &[r#"route="/items/:item""#, r#"method="GET""#, r#"status="200""#],
    )
    .unwrap();
    assert!(hits.ends_with(" 2"), "{hits}");

    let created = sample(
        &rendered,
        "http_requests_total",
        &[r#"route="/items""#, r#"method="POST""#, r#"status="201""#],
    )
    .unwrap();
    assert!(created.ends_with(" 1"), "{created}");

    assert!(sample(
        &rendered,
        "http_requests_total",
        &[r#"route="unmatched""#, r#"status="404""#],
    )
    .is_some());

    let timed = sample(
        &rendered,
        "http_request_duration_seconds_count",
        &[r#"route="/items/:item""#, r#"status="200""#],
    )
    .unwrap();
    assert!(timed.ends_with(" 2"), "{timed}");
}

#[test]
fn metric_names_take_the_configured_prefix() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let mut server = Server::new();
    server.middleware(Metrics::new("shop"));
    server.get("/", ok);

    metrics::with_local_recorder(&recorder, || block_on(send(&server, get("/"))));

    let rendered = handle.render();
    assert!(sample(&rendered, "shop_requests_total", &[r#"route="/""#]).is_some());
    assert!(sample(&rendered, "http_requests_total", &[]).is_none());
}

type Fields = HashMap<String, String>;

/// Keeps the fields of every `http_request` span, including late records.
#[derive(Clone, Default)]
struct SpanCapture {
    spans: Arc<Mutex<HashMap<u64, Fields>>>,
}

struct FieldVisitor<'a>(&'a mut Fields);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for SpanCapture
where
    S: Subscriber + for<'l> LookupSpan<'l>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: LayerContext<'_, S>) {
        if attrs.metadata().name() != "http_request" {
            return;
        }
        let mut fields = Fields::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        self.spans.lock().unwrap().insert(id.into_u64(), fields);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: LayerContext<'_, S>) {
        if let Some(fields) = self.spans.lock().unwrap().get_mut(&id.into_u64()) {
            values.record(&mut FieldVisitor(fields));
        }
    }
}

impl SpanCapture {
    fn only(&self) -> Fields {
        let spans = self.spans.lock().unwrap();
        assert_eq!(spans.len(), 1);
        spans.values().next().cloned().unwrap()
    }
}

#[test]
fn requests_run_inside_a_span_named_after_the_route() {
    let capture = SpanCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let server = app();

    tracing::subscriber::with_default(subscriber, || {
        block_on(send(&server, get("/items/7").with_header("host", "shop.local")))
    });

    let fields = capture.only();
    assert_eq!(fields["http.request.method"], "GET");
    assert_eq!(fields["url.path"], "/items/7");
    assert_eq!(fields["server.address"], "shop.local");
    assert_eq!(fields["http.route"], "/items/:item");
    assert_eq!(fields["http.response.status_code"], "200");
    assert_eq!(fields["otel.name"], "GET /items/:item");
}

#[test]
fn unmatched_requests_are_traced_too() {
    let capture = SpanCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let server = app();

    tracing::subscriber::with_default(subscriber, || block_on(send(&server, get("/nowhere"))));

    let fields = capture.only();
    assert_eq!(fields["http.route"], "unknown");
    assert_eq!(fields["http.response.status_code"], "404");
}
