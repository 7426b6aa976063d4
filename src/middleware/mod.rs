mod access_log;
mod auth;
mod error_page;
pub(crate) mod recovery;
mod request_metrics;
mod request_tracing;

pub use access_log::AccessLog;
pub use auth::TokenAuth;
pub use error_page::ErrorPage;
pub use recovery::Recovery;
pub use request_metrics::Metrics;
pub use request_tracing::RequestTracing;

use crate::context::Context;
use crate::handler::Handler;
use futures::future::BoxFuture;
use std::sync::Arc;

pub type MiddlewareResult<'a> = BoxFuture<'a, ()>;

/// Intercepts a request on its way to the handler.
///
/// A middleware may run code before and after `next.run(ctx)`, or skip it
/// entirely to short-circuit the rest of the chain.
pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareResult<'a>;
}

pub(crate) type MiddlewareStack = Vec<Arc<dyn Middleware>>;

/// The remainder of a middleware chain, ending in a handler.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Composes `chain` around `endpoint`. The first middleware is the
    /// outermost one: `chain[0](chain[1](..(endpoint)))`.
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Handler) -> Self {
        Self { chain, endpoint }
    }

    pub fn run<'b>(self, ctx: &'b mut Context) -> BoxFuture<'b, ()>
    where
        'a: 'b,
    {
        match self.chain.split_first() {
            Some((middleware, rest)) => middleware.call(ctx, Next::new(rest, self.endpoint)),
            None => self.endpoint.call(ctx),
        }
    }
}

/// Middleware built from a closure, see [`from_fn`].
pub struct FromFn<F> {
    f: F,
}

impl<F> Middleware for FromFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareResult<'a> {
        (self.f)(ctx, next)
    }
}

/// Turns a closure into a [`Middleware`].
///
/// ```ignore
/// server.middleware(from_fn(|ctx, next| Box::pin(async move {
///     next.run(ctx).await;
///     ctx.set_header("X-Served-By", "weft");
/// })));
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    FromFn { f }
}
