use crate::context::Context;
use crate::middleware::{Middleware, MiddlewareResult, Next};
use std::collections::HashMap;

/// Replaces the response body for selected status codes once the inner
/// chain has finished.
#[derive(Clone, Default)]
pub struct ErrorPage {
    pages: HashMap<u16, Vec<u8>>,
}

impl ErrorPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(status, body.into());
        self
    }
}

impl Middleware for ErrorPage {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareResult<'a> {
        Box::pin(async move {
            next.run(ctx).await;
            if let Some(page) = self.pages.get(&ctx.status()) {
                ctx.set_body(page.clone());
            }
        })
    }
}
