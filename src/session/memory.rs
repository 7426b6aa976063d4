use crate::cache::CacheManager;
use crate::error::SessionError;
use crate::session::{Session, SessionResult, Store};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const MAX_SESSIONS: u64 = 100_000;

/// In-process session store. Sessions expire `expiration` after they were
/// generated or last refreshed.
#[derive(Clone)]
pub struct MemoryStore {
    sessions: CacheManager<String, Arc<MemorySession>>,
}

impl MemoryStore {
    pub fn new(expiration: Duration) -> Self {
        Self {
            sessions: CacheManager::with_ttl(MAX_SESSIONS, expiration),
        }
    }

    async fn lookup(&self, id: &str) -> SessionResult<Arc<MemorySession>> {
        self.sessions
            .get(&id.to_owned())
            .await
            .ok_or_else(|| SessionError::NotFound { id: id.to_owned() })
    }
}

impl Store for MemoryStore {
    fn generate<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SessionResult<Arc<dyn Session>>> {
        Box::pin(async move {
            let session = Arc::new(MemorySession {
                id: id.to_owned(),
                values: RwLock::new(HashMap::new()),
            });
            self.sessions.set(id.to_owned(), Arc::clone(&session)).await;
            Ok(session as Arc<dyn Session>)
        })
    }

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SessionResult<Arc<dyn Session>>> {
        Box::pin(async move {
            let session = self.lookup(id).await?;
            Ok(session as Arc<dyn Session>)
        })
    }

    fn refresh<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SessionResult<()>> {
        Box::pin(async move {
            let session = self.lookup(id).await?;
            self.sessions.set(id.to_owned(), session).await;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SessionResult<()>> {
        Box::pin(async move {
            self.sessions.remove(&id.to_owned()).await;
            Ok(())
        })
    }
}

pub struct MemorySession {
    id: String,
    values: RwLock<HashMap<String, Value>>,
}

impl Session for MemorySession {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, SessionResult<Value>> {
        Box::pin(async move {
            self.values
                .read()
                .await
                .get(key)
                .cloned()
                .ok_or_else(|| SessionError::KeyNotFound {
                    key: key.to_owned(),
                })
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, SessionResult<()>> {
        Box::pin(async move {
            self.values.write().await.insert(key.to_owned(), value);
            Ok(())
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}
