#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Span lifecycle of `TraceSource`: every traced call opens exactly one span
//! and closes it exactly once, whatever way the call ends.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use svckit::TraceSource;
use svckit::errors::{BrokenRule, ErrorCode, ServiceError};
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, Registry};

#[derive(Debug, Clone, PartialEq, Eq)]
enum SpanEvent {
    Opened {
        name: String,
        kind: String,
        parent: Option<String>,
    },
    Closed {
        name: String,
    },
}

#[derive(Clone, Default)]
struct Capture {
    events: Arc<Mutex<Vec<SpanEvent>>>,
}

#[derive(Default)]
struct OtelFields {
    name: Option<String>,
    kind: Option<String>,
}

impl Visit for OtelFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "otel.name" => self.name = Some(value.to_owned()),
            "otel.kind" => self.kind = Some(value.to_owned()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "otel.name" {
            self.name = Some(format!("{value:?}"));
        }
    }
}

/// Display name stored in extensions so `on_close` can report it.
struct OtelName(String);

impl<S> Layer<S> for Capture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = OtelFields::default();
        attrs.record(&mut fields);
        let span = ctx.span(id).expect("span exists");
        let name = fields.name.unwrap_or_else(|| span.name().to_owned());
        let parent = span.parent().map(|p| {
            p.extensions()
                .get::<OtelName>()
                .map_or_else(|| p.name().to_owned(), |n| n.0.clone())
        });
        span.extensions_mut().insert(OtelName(name.clone()));

        self.events.lock().push(SpanEvent::Opened {
            name,
            kind: fields.kind.unwrap_or_default(),
            parent,
        });
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let span = ctx.span(&id).expect("span exists");
        let name = span
            .extensions()
            .get::<OtelName>()
            .map(|n| n.0.clone())
            .unwrap_or_default();
        self.events.lock().push(SpanEvent::Closed { name });
    }
}

impl Capture {
    fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(Registry::default().with(self.clone()))
    }

    fn opened(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, SpanEvent::Opened { name: n, .. } if n == name))
            .count()
    }

    fn closed(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, SpanEvent::Closed { name: n } if n == name))
            .count()
    }

    fn assert_balanced(&self, name: &str, times: usize) {
        assert_eq!(self.opened(name), times, "opened {name}");
        assert_eq!(self.closed(name), times, "closed {name}");
    }
}

const SRC: TraceSource = TraceSource::new("ProductRepository");

#[test]
fn sync_success_opens_and_closes_once() {
    let capture = Capture::default();
    let _guard = capture.install();

    let out = SRC.in_span("get_by_id", || 42);

    assert_eq!(out, 42);
    capture.assert_balanced("ProductRepository.get_by_id", 1);
    let events = capture.events.lock();
    assert!(matches!(
        &events[0],
        SpanEvent::Opened { kind, .. } if kind == "internal"
    ));
}

#[test]
fn sync_error_is_returned_unchanged() {
    let capture = Capture::default();
    let _guard = capture.install();

    let out: Result<(), ServiceError> = SRC.in_span("insert_product", || {
        Err(BrokenRule::error(ErrorCode::from_static("Product_AlreadyExists"))
            .with_params(["Widget"])
            .into())
    });

    match out.unwrap_err() {
        ServiceError::BusinessRuleViolation(rules) => {
            assert_eq!(rules.rules()[0].error_code(), "Product_AlreadyExists");
            assert_eq!(rules.rules()[0].parameters()[0], "Widget");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    capture.assert_balanced("ProductRepository.insert_product", 1);
}

#[test]
fn panic_closes_span_while_unwinding() {
    let capture = Capture::default();
    let _guard = capture.install();

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        SRC.in_span("explode", || -> u8 { panic!("boom") })
    }));

    assert!(result.is_err());
    capture.assert_balanced("ProductRepository.explode", 1);
}

#[tokio::test]
async fn async_error_is_returned_unchanged() {
    let capture = Capture::default();
    let _guard = capture.install();

    let out: Result<(), ServiceError> = SRC
        .instrument("get_products", async {
            Err(ServiceError::validation("Filter must not be empty"))
        })
        .await;

    assert_eq!(
        out.unwrap_err().to_string(),
        "validation failed: Filter must not be empty"
    );
    capture.assert_balanced("ProductRepository.get_products", 1);
}

#[tokio::test]
async fn dropped_future_closes_span_once() {
    let capture = Capture::default();
    let _guard = capture.install();

    let slow = SRC.instrument("slow", std::future::pending::<()>());
    let timed_out = tokio::time::timeout(Duration::from_millis(10), slow).await;

    assert!(timed_out.is_err());
    capture.assert_balanced("ProductRepository.slow", 1);
}

#[tokio::test]
async fn cancellation_mid_flight_is_reported_and_closes_span() {
    let capture = Capture::default();
    let _guard = capture.install();
    let cancel = CancellationToken::new();

    let trigger = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            cancel.cancel();
        }
    };
    let work = SRC.instrument_cancellable::<(), ServiceError, _>(
        "exists_by_name",
        &cancel,
        std::future::pending(),
    );

    let ((), out) = tokio::join!(trigger, work);

    assert!(out.unwrap_err().is_cancelled());
    capture.assert_balanced("ProductRepository.exists_by_name", 1);
}

#[tokio::test]
async fn repeated_calls_produce_independent_spans() {
    let capture = Capture::default();
    let _guard = capture.install();

    for _ in 0..2 {
        let out: Result<(), ServiceError> = SRC
            .instrument("insert_product", async {
                Err(ServiceError::Unclassified(anyhow::anyhow!("db down")))
            })
            .await;
        assert!(out.is_err());
    }

    capture.assert_balanced("ProductRepository.insert_product", 2);
    let events = capture.events.lock();
    // the first span closes before the second one opens
    let names: Vec<_> = events
        .iter()
        .map(|e| match e {
            SpanEvent::Opened { .. } => "open",
            SpanEvent::Closed { .. } => "close",
        })
        .collect();
    assert_eq!(names, ["open", "close", "open", "close"]);
}

#[tokio::test]
async fn service_and_repository_spans_nest_under_request() {
    let capture = Capture::default();
    let _guard = capture.install();
    let service = TraceSource::new("ProductService");

    let request = tracing::info_span!("http_request");
    let out = tracing::Instrument::instrument(
        service.instrument("get_by_id", async {
            SRC.instrument("get_by_id", async { 7 }).await
        }),
        request,
    )
    .await;

    assert_eq!(out, 7);
    let events = capture.events.lock().clone();
    assert!(events.contains(&SpanEvent::Opened {
        name: "ProductService.get_by_id".to_owned(),
        kind: "internal".to_owned(),
        parent: Some("http_request".to_owned()),
    }));
    assert!(events.contains(&SpanEvent::Opened {
        name: "ProductRepository.get_by_id".to_owned(),
        kind: "internal".to_owned(),
        parent: Some("ProductService.get_by_id".to_owned()),
    }));
}
