//! The server is the dispatch core of the crate.
//!
//! It owns the routing trees and the global middleware. For every request it
//! looks up the route, builds a [`Context`], runs
//! `global middleware -> route middleware -> handler` and flushes the
//! response exactly once after the whole chain has unwound.
//!
//! # Examples
//!
//! ```ignore
//! use weft::{Method, Request, Server};
//!
//! let mut server = Server::new();
//! server.get("/order/detail/:id", |ctx| Box::pin(async move {
//!     let id = ctx.path_value("id").unwrap_or_default().to_owned();
//!     ctx.text(200, id);
//! }));
//!
//! let mut out = Vec::new();
//! server.serve(Request::new(Method::GET, "/order/detail/42"), &mut out).await?;
//! ```

use crate::config::ServerConfig;
use crate::context::Context;
use crate::error::{RouteError, ServerError, ServerResult};
use crate::handler::{Handler, NotFound};
use crate::http::{Method, Request, Response, ResponseSink};
use crate::middleware::recovery::panic_message;
use crate::middleware::{Middleware, MiddlewareStack, Next};
use crate::router::{Group, Router};
use crate::template::TemplateEngine;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;

pub struct Server {
    config: ServerConfig,
    router: Router,
    middleware: MiddlewareStack,
    templates: Option<Arc<dyn TemplateEngine>>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            middleware: Vec::new(),
            templates: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn max_connections(&mut self, max_connections: usize) -> &mut Self {
        self.config.max_connections = max_connections;
        self
    }

    pub fn max_body_size(&mut self, max_body_size: usize) -> &mut Self {
        self.config.max_body_size = max_body_size;
        self
    }

    pub fn max_header_size(&mut self, max_header_size: usize) -> &mut Self {
        self.config.max_header_size = max_header_size;
        self
    }

    /// Adds a global middleware. Global middleware wraps every request,
    /// including the ones that end in a 404.
    pub fn middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn template_engine(&mut self, engine: impl TemplateEngine) -> &mut Self {
        self.templates = Some(Arc::new(engine));
        self
    }

    /// The root scope: no prefix and no route middleware.
    pub fn routes(&mut self) -> Group<'_> {
        Group::root(&mut self.router)
    }

    /// Opens the group `/<name>`.
    pub fn group(&mut self, name: &str) -> Group<'_> {
        Group::root(&mut self.router).into_group(name)
    }

    pub fn route<F>(&mut self, method: Method, path: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.routes().route(method, path, handler)?;
        Ok(self)
    }

    pub fn endpoint<H>(&mut self, method: Method, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Handler + 'static,
    {
        self.routes().endpoint(method, path, handler)?;
        Ok(self)
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.routes().get(path, handler);
        self
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.routes().post(path, handler);
        self
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.routes().put(path, handler);
        self
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.routes().delete(path, handler);
        self
    }

    pub fn options<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.routes().options(path, handler);
        self
    }

    /// Dispatches one request and writes the result to `sink`.
    ///
    /// A panic that no [`Recovery`](crate::middleware::Recovery) middleware
    /// caught is logged and answered with a 500; it never escapes this call.
    pub async fn serve<S>(&self, request: Request, sink: &mut S) -> io::Result<()>
    where
        S: ResponseSink + ?Sized,
    {
        let method = request.method();
        let path = request.path().to_owned();
        let mut ctx = Context::new(request);
        if let Some(engine) = &self.templates {
            ctx = ctx.with_template_engine(Arc::clone(engine));
        }

        let endpoint = match self.router.at(method, &path) {
            Some(matched) => match matched.endpoint() {
                Some(endpoint) => {
                    let route = matched.route().unwrap_or_default();
                    ctx.set_route(route, matched.into_params());
                    Some(endpoint)
                }
                None => None,
            },
            None => None,
        };
        let handler: &dyn Handler = match &endpoint {
            Some(endpoint) => endpoint,
            None => &NotFound,
        };

        tracing::debug!(
            method = %method,
            path = %path,
            route = ctx.matched_route().unwrap_or("-"),
            "dispatching request"
        );

        let outcome = AssertUnwindSafe(Next::new(&self.middleware, handler).run(&mut ctx))
            .catch_unwind()
            .await;
        if let Err(panic) = outcome {
            tracing::error!(
                method = %method,
                path = %path,
                panic = %panic_message(panic.as_ref()),
                "handler panicked"
            );
            *ctx.response_mut() = Response::new(500);
            ctx.set_body("Internal Server Error");
        }

        Self::flush(&ctx, sink).await
    }

    async fn flush<S>(ctx: &Context, sink: &mut S) -> io::Result<()>
    where
        S: ResponseSink + ?Sized,
    {
        if let Err(err) = sink.write_response(ctx.response()).await {
            tracing::warn!(error = %err, "failed to write response");
            return Err(err);
        }
        Ok(())
    }

    /// Reads a single HTTP/1.1 request from `stream`, dispatches it and
    /// writes the response back. The connection is not kept alive.
    pub async fn serve_connection<S>(&self, mut stream: S) -> ServerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let request = match self.read_request(&mut stream).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(ServerError::Io(err)) => return Err(ServerError::Io(err)),
            Err(err) => {
                tracing::warn!(error = %err, "rejecting malformed request");
                let mut response = Response::new(err.status_code());
                response.body(err.to_string());
                stream.write_response(&response).await?;
                return Ok(());
            }
        };

        self.serve(request, &mut stream).await?;
        Ok(())
    }

    async fn read_request<S>(&self, stream: &mut S) -> ServerResult<Option<Request>>
    where
        S: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(stream);
        let mut budget = self.config.max_header_size;
        let mut request_line = String::new();
        read_head_line(&mut reader, &mut request_line, &mut budget).await?;
        if request_line.trim().is_empty() {
            return Ok(None);
        }

        let mut parts = request_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| ServerError::BadRequest("missing method".into()))?
            .parse::<Method>()
            .map_err(ServerError::BadRequest)?;
        let target = parts
            .next()
            .ok_or_else(|| ServerError::BadRequest("missing request target".into()))?;

        let mut request = Request::new(method, target);
        if let Ok(decoded) = urlencoding::decode(&request.path) {
            request.path = decoded.into_owned();
        }

        loop {
            let mut line = String::new();
            if read_head_line(&mut reader, &mut line, &mut budget).await? == 0
                || line.trim().is_empty()
            {
                break;
            }
            if let Some((name, value)) = line.trim().split_once(':') {
                request
                    .headers
                    .insert(name.trim().to_lowercase(), value.trim().to_string());
            }
        }

        if let Some(content_type) = request.headers.get("content-type") {
            request.body.content_type = content_type.clone();
        }
        if let Some(length) = request.headers.get("content-length") {
            let length = length
                .parse::<usize>()
                .map_err(|_| ServerError::BadRequest(format!("invalid content-length {length}")))?;
            if length > self.config.max_body_size {
                return Err(ServerError::PayloadTooLarge(length));
            }
            let mut body = Vec::with_capacity(length);
            (&mut reader).take(length as u64).read_to_end(&mut body).await?;
            request.body.data = body;
        }

        Ok(Some(request))
    }

    /// Binds `addr` and serves until the process exits.
    pub fn listen(self, addr: &str) -> ServerResult<()> {
        let runtime = Runtime::new()?;
        runtime.block_on(async move {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %addr, "server listening");
            self.run(listener).await
        })
    }

    /// Accepts connections from `listener`, one task per connection.
    pub async fn run(self, listener: TcpListener) -> ServerResult<()> {
        let server = Arc::new(self);
        let slots = Arc::new(Semaphore::new(server.config.max_connections));

        loop {
            let permit = Arc::clone(&slots)
                .acquire_owned()
                .await
                .map_err(|_| io::Error::other("connection limiter closed"))?;

            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    continue;
                }
            };

            let server = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(err) = server.serve_connection(stream).await {
                    tracing::warn!(peer = %peer, error = %err, "connection error");
                }
                drop(permit);
            });
        }
    }
}

/// Reads one line of the request head, charging it against `budget`.
async fn read_head_line<R>(reader: &mut R, line: &mut String, budget: &mut usize) -> ServerResult<usize>
where
    R: AsyncBufRead + Unpin,
{
    let limit = *budget;
    let read = (&mut *reader).take(limit as u64 + 1).read_line(line).await?;
    if read > limit {
        return Err(ServerError::HeaderTooLarge(limit));
    }
    *budget -= read;
    Ok(read)
}
