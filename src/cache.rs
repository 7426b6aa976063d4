use moka::future::Cache;
use std::hash::Hash;
use std::time::Duration;

/// Bounded async cache shared by the session store and the static file
/// handler.
#[derive(Clone)]
pub struct CacheManager<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<K, V>,
}

impl<K, V> CacheManager<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Entries expire `ttl` after their last insert.
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key).await
    }

    pub async fn set(&self, key: K, value: V) {
        self.cache.insert(key, value).await;
    }

    pub async fn remove(&self, key: &K) {
        self.cache.remove(key).await;
    }
}
