#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use weft::{from_fn, BoxFuture, Context, Middleware, Request, Server};

/// A parsed HTTP/1.1 response as written by the server.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Number of status lines found in the output.
    pub writes: usize,
}

impl Reply {
    pub fn parse(raw: &[u8]) -> Reply {
        let text = String::from_utf8_lossy(raw).into_owned();
        let writes = text.matches("HTTP/1.1 ").count();
        let (head, body) = text.split_once("\r\n\r\n").unwrap_or((&text, ""));
        let mut lines = head.split("\r\n");
        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|line| line.split_once(": "))
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();

        Reply {
            status,
            headers,
            body: body.to_owned(),
            writes,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

pub async fn send(server: &Server, request: Request) -> Reply {
    let mut out: Vec<u8> = Vec::new();
    server.serve(request, &mut out).await.unwrap();
    Reply::parse(&out)
}

/// Shared, ordered record of what ran.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Middleware recording `<name> in` before and `<name> out` after the chain.
pub fn traced(trace: &Trace, name: &'static str) -> impl Middleware {
    let trace = trace.clone();
    from_fn(move |ctx, next| {
        let trace = trace.clone();
        Box::pin(async move {
            trace.push(format!("{name} in"));
            next.run(ctx).await;
            trace.push(format!("{name} out"));
        })
    })
}

pub fn ok(ctx: &mut Context) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        ctx.text(200, "ok");
    })
}
