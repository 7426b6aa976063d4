//! # Weft
//!
//! An HTTP dispatch core: a per-method segment trie router, middleware
//! scoped to the server, to route groups and to single routes, and a
//! per-request [`Context`] that handlers and middleware share.
//!
//! ## Quick Start
//!
//! ```ignore
//! use weft::middleware::{AccessLog, Recovery, TokenAuth};
//! use weft::Server;
//!
//! let mut server = Server::new();
//! server.middleware(AccessLog).middleware(Recovery::default());
//!
//! server.get("/", |ctx| Box::pin(async move {
//!     ctx.text(200, "hello");
//! }));
//!
//! let mut v1 = server.group("v1");
//! let mut admins = v1.group("admins").with(TokenAuth::default());
//! admins.get("/users/:id", |ctx| Box::pin(async move {
//!     let id = ctx.path_value("id").unwrap_or_default().to_owned();
//!     let _ = ctx.respond_json(200, &serde_json::json!({ "id": id }));
//! }));
//!
//! server.listen("127.0.0.1:3000")?;
//! ```
//!
//! ## Route patterns
//!
//! Literal segments match verbatim and `:name` matches any single non-empty
//! segment. Patterns must start with `/`, must not end with `/` (except `/`
//! itself) and must not contain empty segments. Registering a pattern twice,
//! or two differently named parameters at the same position, is rejected.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;
pub mod session;
pub mod template;

pub use config::ServerConfig;
pub use context::Context;
pub use error::{ContextError, RouteError, ServerError, SessionError, TemplateError};
pub use handler::Handler;
pub use http::{FormFile, Method, Request, Response, ResponseSink};
pub use middleware::{from_fn, Middleware, Next};
pub use router::{Group, Router};
pub use server::Server;
pub use template::TemplateEngine;

pub use futures::future::BoxFuture;
pub use serde_json::{json, Value};
