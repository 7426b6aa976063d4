use crate::context::Context;
use crate::middleware::{Middleware, MiddlewareResult, Next};

/// Rejects requests that do not carry a non-empty token header with 401,
/// without running the rest of the chain.
#[derive(Clone)]
pub struct TokenAuth {
    header: String,
}

impl TokenAuth {
    pub fn new(header: &str) -> Self {
        Self {
            header: header.to_lowercase(),
        }
    }
}

impl Default for TokenAuth {
    fn default() -> Self {
        Self::new("token")
    }
}

impl Middleware for TokenAuth {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareResult<'a> {
        Box::pin(async move {
            let authorized = matches!(
                ctx.request().header(&self.header),
                Some(token) if !token.is_empty()
            );
            if authorized {
                next.run(ctx).await;
            } else {
                ctx.set_status(401);
            }
        })
    }
}
