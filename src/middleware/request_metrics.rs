use crate::context::Context;
use crate::middleware::{Middleware, MiddlewareResult, Next};
use std::time::Instant;

/// Records request counts and latencies through the `metrics` facade.
///
/// Two series are emitted, labelled with `route`, `method` and `status`:
/// `<prefix>_requests_total` (counter) and
/// `<prefix>_request_duration_seconds` (histogram). Requests that match no
/// route are labelled `route="unmatched"`. Install any `metrics` recorder,
/// such as `metrics-exporter-prometheus`, to collect them.
#[derive(Clone)]
pub struct Metrics {
    requests: String,
    duration: String,
}

impl Metrics {
    pub fn new(prefix: &str) -> Self {
        Self {
            requests: format!("{prefix}_requests_total"),
            duration: format!("{prefix}_request_duration_seconds"),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new("http")
    }
}

impl Middleware for Metrics {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareResult<'a> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().as_str();

            next.run(ctx).await;

            let route = ctx.matched_route().unwrap_or("unmatched").to_owned();
            let status = ctx.response().written_status().to_string();
            metrics::counter!(
                self.requests.clone(),
                "route" => route.clone(),
                "method" => method,
                "status" => status.clone()
            )
            .increment(1);
            metrics::histogram!(
                self.duration.clone(),
                "route" => route,
                "method" => method,
                "status" => status
            )
            .record(start.elapsed().as_secs_f64());
        })
    }
}
