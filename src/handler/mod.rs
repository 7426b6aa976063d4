use crate::context::Context;
use futures::future::BoxFuture;

/// A terminal request handler.
///
/// Handlers report everything through the context: status, headers, body and
/// user values. There is no return value to signal failure.
///
/// Closures of the shape `|ctx| Box::pin(async move { ... })` implement this
/// trait; types that carry their own state implement it directly.
pub trait Handler: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        (self)(ctx)
    }
}

/// Terminal used when no route matches, or the matched node has no handler.
pub(crate) struct NotFound;

impl Handler for NotFound {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            ctx.set_status(404).set_body("Not Found");
        })
    }
}
