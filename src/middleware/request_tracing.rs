use crate::context::Context;
use crate::middleware::{Middleware, MiddlewareResult, Next};
use tracing::field::Empty;
use tracing::Instrument;

/// Runs the rest of the chain inside an `http_request` span.
///
/// Field names follow the OpenTelemetry HTTP conventions. `http.route`,
/// `http.response.status_code` and `otel.name` are filled in once the chain
/// has unwound, so a `tracing-opentelemetry` layer exports the span under
/// the matched route.
#[derive(Clone, Copy, Default)]
pub struct RequestTracing;

impl Middleware for RequestTracing {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareResult<'a> {
        let request = ctx.request();
        let method = request.method();
        let span = tracing::info_span!(
            "http_request",
            http.request.method = %method,
            url.path = %request.path(),
            server.address = request.header("host").unwrap_or("-"),
            http.route = Empty,
            http.response.status_code = Empty,
            otel.name = Empty,
        );

        Box::pin(async move {
            next.run(ctx).instrument(span.clone()).await;

            let route = ctx.matched_route().unwrap_or("unknown");
            span.record("http.route", route);
            span.record("http.response.status_code", ctx.response().written_status());
            span.record("otel.name", format!("{method} {route}").as_str());
        })
    }
}
