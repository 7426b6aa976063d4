//! Session support built on the handler contract.
//!
//! A [`Store`] keeps session state, a [`Propagator`] carries the session id
//! between client and server, and the [`Manager`] ties both to a request
//! [`Context`].

pub mod cookie;
pub mod memory;

use crate::context::Context;
use crate::error::SessionError;
use crate::http::{Request, Response};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub type SessionResult<T> = Result<T, SessionError>;

pub trait Session: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, SessionResult<Value>>;
    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, SessionResult<()>>;
    fn id(&self) -> &str;
}

pub trait Store: Send + Sync {
    fn generate<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SessionResult<Arc<dyn Session>>>;
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SessionResult<Arc<dyn Session>>>;
    fn refresh<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SessionResult<()>>;
    fn remove<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SessionResult<()>>;
}

pub trait Propagator: Send + Sync {
    fn inject(&self, id: &str, response: &mut Response) -> SessionResult<()>;
    fn extract(&self, request: &Request) -> SessionResult<String>;
    fn remove(&self, response: &mut Response) -> SessionResult<()>;
}

pub struct Manager {
    store: Arc<dyn Store>,
    propagator: Arc<dyn Propagator>,
    ctx_key: String,
}

impl Manager {
    pub fn new(store: impl Store + 'static, propagator: impl Propagator + 'static) -> Self {
        Self {
            store: Arc::new(store),
            propagator: Arc::new(propagator),
            ctx_key: "session".to_owned(),
        }
    }

    /// The user-value key a loaded session is cached under.
    pub fn with_ctx_key(mut self, key: &str) -> Self {
        self.ctx_key = key.to_owned();
        self
    }

    /// Loads the session for this request, at most once per request.
    pub async fn get_session(&self, ctx: &mut Context) -> SessionResult<Arc<dyn Session>> {
        if let Ok(session) = ctx.user_value::<Arc<dyn Session>>(&self.ctx_key) {
            return Ok(Arc::clone(session));
        }

        let id = self.propagator.extract(ctx.request())?;
        let session = self.store.get(&id).await?;
        ctx.set_user_value(&self.ctx_key, Arc::clone(&session));
        Ok(session)
    }

    /// Starts a new session and hands its id to the client.
    pub async fn init_session(&self, ctx: &mut Context) -> SessionResult<Arc<dyn Session>> {
        let id = Uuid::new_v4().to_string();
        let session = self.store.generate(&id).await?;
        self.propagator.inject(&id, ctx.response_mut())?;
        ctx.set_user_value(&self.ctx_key, Arc::clone(&session));
        tracing::debug!(session = %id, "session created");
        Ok(session)
    }

    pub async fn refresh_session(&self, ctx: &mut Context) -> SessionResult<()> {
        let session = self.get_session(ctx).await?;
        self.store.refresh(session.id()).await
    }

    pub async fn remove_session(&self, ctx: &mut Context) -> SessionResult<()> {
        let session = self.get_session(ctx).await?;
        self.store.remove(session.id()).await?;
        self.propagator.remove(ctx.response_mut())?;
        ctx.remove_user_value(&self.ctx_key);
        Ok(())
    }
}
