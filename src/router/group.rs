use crate::context::Context;
use crate::error::RouteError;
use crate::handler::Handler;
use crate::http::Method;
use crate::middleware::{Middleware, MiddlewareStack};
use crate::router::Router;
use futures::future::BoxFuture;
use std::sync::Arc;

/// A path prefix plus the middleware every route registered through it gets.
///
/// Deriving a child group copies this group's middleware; adding middleware
/// to the child never reaches the parent. Routes capture the group's
/// middleware as it is when they are registered.
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
    middleware: MiddlewareStack,
}

impl<'r> Group<'r> {
    pub(crate) fn root(router: &'r mut Router) -> Self {
        Self {
            router,
            prefix: String::new(),
            middleware: Vec::new(),
        }
    }

    /// Derives `<prefix>/<name>`. An empty name keeps the current prefix.
    pub fn group(&mut self, name: &str) -> Group<'_> {
        Group {
            prefix: self.child_prefix(name),
            middleware: self.middleware.clone(),
            router: &mut *self.router,
        }
    }

    pub(crate) fn into_group(self, name: &str) -> Group<'r> {
        Group {
            prefix: self.child_prefix(name),
            middleware: self.middleware,
            router: self.router,
        }
    }

    fn child_prefix(&self, name: &str) -> String {
        if name.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }

    /// Appends a middleware to this group.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers a closure handler, reporting malformed or conflicting
    /// patterns instead of panicking.
    pub fn route<F>(&mut self, method: Method, path: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.add(method, path, Arc::new(handler))
    }

    /// Registers a handler type such as a
    /// [`StaticResourceHandler`](crate::files::StaticResourceHandler).
    pub fn endpoint<H>(&mut self, method: Method, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Handler + 'static,
    {
        self.add(method, path, Arc::new(handler))
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.register(Method::GET, path, Arc::new(handler))
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.register(Method::POST, path, Arc::new(handler))
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.register(Method::PUT, path, Arc::new(handler))
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.register(Method::DELETE, path, Arc::new(handler))
    }

    pub fn options<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.register(Method::OPTIONS, path, Arc::new(handler))
    }

    fn add(&mut self, method: Method, path: &str, handler: Arc<dyn Handler>) -> Result<&mut Self, RouteError> {
        let full_path = format!("{}{}", self.prefix, path);
        self.router
            .insert(method, &full_path, handler, self.middleware.clone())?;
        tracing::debug!(method = %method, route = %full_path, "route registered");
        Ok(self)
    }

    fn register(&mut self, method: Method, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        if let Err(err) = self.add(method, path, handler) {
            panic!("{err}");
        }
        self
    }
}
