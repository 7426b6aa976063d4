use crate::context::Context;
use crate::middleware::{Middleware, MiddlewareResult, Next};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// Turns a panic in any inner layer into a fixed response.
///
/// Layers outside of `Recovery` still run their post-processing, since the
/// panic stops here.
#[derive(Clone)]
pub struct Recovery {
    status: u16,
    body: Vec<u8>,
}

impl Recovery {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new(500, "Internal Server Error")
    }
}

impl Middleware for Recovery {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareResult<'a> {
        Box::pin(async move {
            let outcome = AssertUnwindSafe(next.run(ctx)).catch_unwind().await;
            if let Err(panic) = outcome {
                tracing::error!(
                    route = ctx.matched_route().unwrap_or("-"),
                    path = %ctx.request().path(),
                    panic = %panic_message(panic.as_ref()),
                    "recovered from panic"
                );
                ctx.set_status(self.status).set_body(self.body.clone());
            }
        })
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}
