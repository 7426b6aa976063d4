//! Segment trie routing.
//!
//! Each HTTP method owns an independent tree. A node has static children
//! keyed by their literal segment and at most one parametric child (`:name`).
//! Lookups prefer the static child and fall back to the parametric one; there
//! is no backtracking, so the result never depends on registration order.

mod group;

pub use group::Group;

use crate::context::Context;
use crate::error::RouteError;
use crate::handler::Handler;
use crate::http::Method;
use crate::middleware::{Middleware, MiddlewareStack, Next};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct Node {
    segment: String,
    route: Option<String>,
    children: HashMap<String, Node>,
    param_child: Option<Box<Node>>,
    handler: Option<Arc<dyn Handler>>,
    middleware: MiddlewareStack,
}

impl Node {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_owned(),
            route: None,
            children: HashMap::new(),
            param_child: None,
            handler: None,
            middleware: Vec::new(),
        }
    }

    fn param_name(&self) -> &str {
        self.segment.trim_start_matches(':')
    }

    fn child_or_create(&mut self, segment: &str) -> Result<&mut Node, RouteError> {
        if segment.starts_with(':') {
            if let Some(child) = &self.param_child {
                if child.segment != segment {
                    return Err(RouteError::ParamConflict {
                        existing: child.param_name().to_owned(),
                        attempted: segment[1..].to_owned(),
                    });
                }
            }
            return Ok(&mut **self
                .param_child
                .get_or_insert_with(|| Box::new(Node::new(segment))));
        }

        Ok(self
            .children
            .entry(segment.to_owned())
            .or_insert_with(|| Node::new(segment)))
    }

    /// Returns the child matching `segment` and whether it is parametric.
    fn child_of(&self, segment: &str) -> Option<(&Node, bool)> {
        if let Some(child) = self.children.get(segment) {
            return Some((child, false));
        }
        if segment.is_empty() {
            return None;
        }
        self.param_child.as_deref().map(|child| (child, true))
    }

    fn bind(
        &mut self,
        route: &str,
        handler: Arc<dyn Handler>,
        middleware: MiddlewareStack,
    ) -> Result<(), RouteError> {
        if self.handler.is_some() {
            return Err(RouteError::DuplicateRoute {
                route: route.to_owned(),
            });
        }
        self.handler = Some(handler);
        self.route = Some(route.to_owned());
        self.middleware = middleware;
        Ok(())
    }
}

/// One routing tree per HTTP method.
#[derive(Default)]
pub struct Router {
    trees: HashMap<Method, Node>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` and `path`, binding `middleware` to
    /// this exact route.
    pub fn insert(
        &mut self,
        method: Method,
        path: &str,
        handler: Arc<dyn Handler>,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Result<(), RouteError> {
        let segments = validate(path)?;
        let mut node = self.trees.entry(method).or_insert_with(|| Node::new("/"));
        for segment in segments {
            node = node.child_or_create(segment)?;
        }
        node.bind(path, handler, middleware)
    }

    /// Walks the tree for `method`. A match may land on an intermediate node
    /// without a handler; callers treat that like no match at all.
    pub fn at(&self, method: Method, path: &str) -> Option<Match<'_>> {
        let mut node = self.trees.get(&method)?;
        let mut params = HashMap::new();
        if path == "/" {
            return Some(Match { node, params });
        }

        for segment in path.trim_matches('/').split('/') {
            let (child, is_param) = node.child_of(segment)?;
            if is_param {
                params.insert(child.param_name().to_owned(), segment.to_owned());
            }
            node = child;
        }

        Some(Match { node, params })
    }
}

fn validate(path: &str) -> Result<Vec<&str>, RouteError> {
    if path.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    if !path.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash {
            path: path.to_owned(),
        });
    }
    if path == "/" {
        return Ok(Vec::new());
    }
    if path.ends_with('/') {
        return Err(RouteError::TrailingSlash {
            path: path.to_owned(),
        });
    }

    let segments: Vec<&str> = path[1..].split('/').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(RouteError::EmptySegment {
                path: path.to_owned(),
            });
        }
        if *segment == ":" {
            return Err(RouteError::UnnamedParam {
                path: path.to_owned(),
            });
        }
    }
    Ok(segments)
}

/// The outcome of a successful tree walk.
pub struct Match<'r> {
    node: &'r Node,
    params: HashMap<String, String>,
}

impl<'r> Match<'r> {
    pub fn has_handler(&self) -> bool {
        self.node.handler.is_some()
    }

    /// The registered pattern, e.g. `/order/detail/:id`.
    pub fn route(&self) -> Option<&'r str> {
        self.node.route.as_deref()
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn into_params(self) -> HashMap<String, String> {
        self.params
    }

    /// The handler wrapped in its route middleware, if the node has one.
    pub(crate) fn endpoint(&self) -> Option<RouteEndpoint<'r>> {
        let handler = self.node.handler.as_deref()?;
        Some(RouteEndpoint {
            middleware: &self.node.middleware,
            handler,
        })
    }
}

pub(crate) struct RouteEndpoint<'r> {
    middleware: &'r [Arc<dyn Middleware>],
    handler: &'r dyn Handler,
}

impl Handler for RouteEndpoint<'_> {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Next::new(self.middleware, self.handler).run(ctx)
    }
}
