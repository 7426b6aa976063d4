use crate::context::Context;
use crate::middleware::{Middleware, MiddlewareResult, Next};
use std::time::Instant;

/// Emits one `tracing` event per request after the inner chain has run.
#[derive(Clone, Copy, Default)]
pub struct AccessLog;

impl Middleware for AccessLog {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareResult<'a> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method();
            let path = ctx.request().path().to_owned();

            next.run(ctx).await;

            tracing::info!(
                method = %method,
                path = %path,
                route = ctx.matched_route().unwrap_or("-"),
                status = ctx.status(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "request completed"
            );
        })
    }
}
