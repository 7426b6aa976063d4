use std::io;
use thiserror::Error;

/// Errors raised while registering routes.
///
/// These are programmer mistakes caught at startup. The panicking
/// registration helpers (`get`, `post`, ...) turn them into a panic so a
/// misconfigured server never starts serving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route path must not be empty")]
    EmptyPath,
    #[error("route path must start with '/': {path}")]
    MissingLeadingSlash { path: String },
    #[error("route path must not end with '/': {path}")]
    TrailingSlash { path: String },
    #[error("route path must not contain empty segments: {path}")]
    EmptySegment { path: String },
    #[error("path parameters must be named: {path}")]
    UnnamedParam { path: String },
    #[error("route conflict, {route} is already registered")]
    DuplicateRoute { route: String },
    #[error("route conflict, parameter :{attempted} collides with :{existing} at the same position")]
    ParamConflict { existing: String, attempted: String },
}

/// Errors handed back to handlers that read from or write to a [`Context`].
///
/// [`Context`]: crate::context::Context
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to decode request body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode response body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("key not found: {key}")]
    KeyNotFound { key: String },
    #[error("value for {key} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
    #[error("malformed form data: {0}")]
    Form(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ContextError {
    pub(crate) fn key_not_found(key: &str) -> Self {
        ContextError::KeyNotFound { key: key.to_owned() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("no template engine configured")]
    NoEngine,
    #[error("template not found: {name}")]
    Missing { name: String },
    #[error("template rendering failed: {0}")]
    Render(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session not found: {id}")]
    NotFound { id: String },
    #[error("session key not found: {key}")]
    KeyNotFound { key: String },
    #[error("request carries no session cookie")]
    NoCookie,
    #[error("session id is not a valid cookie value")]
    InvalidValue,
}

/// Transport level failures, reported before a request reaches the router.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Request header too large: limit is {0} bytes")]
    HeaderTooLarge(usize),
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::BadRequest(_) => 400,
            ServerError::PayloadTooLarge(_) => 413,
            ServerError::HeaderTooLarge(_) => 431,
            ServerError::Io(_) => 500,
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
