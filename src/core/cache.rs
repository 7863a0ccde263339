use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheValue<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheValue<V> {
    fn is_fresh(&self) -> bool {
        self.expires_at.is_none_or(|expiry| expiry > Instant::now())
    }
}

type Slot<V> = Arc<tokio::sync::Mutex<Option<CacheValue<V>>>>;

/// Read-through cache with one construction lock per key.
///
/// The outer map lock is only held to look up or create a key's slot;
/// loading a value holds just that slot's lock, so concurrent misses on
/// different keys never wait on each other and concurrent misses on the
/// same key load once.
pub struct Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    slots: Mutex<HashMap<K, Slot<V>>>,
    ttl: Option<Duration>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::with_ttl(None)
    }

    /// Entries older than `ttl` are reloaded on next access.
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Returns the cached value or loads it with `load`. Failed loads are
    /// not cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;
        if let Some(entry) = guard.as_ref().filter(|entry| entry.is_fresh()) {
            debug!("Cache HIT for key: {:?}", key);
            return Ok(entry.value.clone());
        }
        debug!("Cache MISS for key: {:?}", key);
        let value = load().await?;
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        *guard = Some(CacheValue {
            value: value.clone(),
            expires_at,
        });
        Ok(value)
    }

    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.clear();
        debug!("Cache CLEAR");
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
