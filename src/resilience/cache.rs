use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry<T> {
    value: T,
    created_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Keyed, time-bounded memoization of upstream responses.
///
/// Expiry is lazy: an expired entry found by `get` is removed on the spot
/// and reported as a miss. A background sweep also runs on a fixed interval
/// so entries that are never queried again still get evicted. There is no
/// size bound; key cardinality is the caller's responsibility.
///
/// Keys are opaque strings built by the caller from the request identity
/// (rounded coordinates, lower-cased city name). The cache does no
/// normalization of its own.
pub struct TtlCache<T> {
    name: &'static str,
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> TtlCache<T> {
    pub fn new(name: &'static str, ttl: Duration, sweep_interval: Duration) -> Self {
        let entries: Arc<RwLock<HashMap<String, CacheEntry<T>>>> =
            Arc::new(RwLock::new(HashMap::new()));

        spawn_sweeper(name, ttl, sweep_interval, Arc::downgrade(&entries));

        tracing::info!("Created cache [{}] with TTL {:?}", name, ttl);
        Self { name, ttl, entries }
    }

    /// Returns the cached value, or `None` on miss or expiry. Never
    /// returns an entry older than the TTL.
    pub fn get(&self, key: &str) -> Option<T> {
        {
            let entries = self.entries.read().expect("cache lock poisoned");
            match entries.get(key) {
                Some(entry) if !entry.is_expired(self.ttl) => {
                    tracing::debug!("Cache hit for key {} in cache [{}]", key, self.name);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    tracing::debug!("Cache miss for key {} in cache [{}]", key, self.name);
                    return None;
                }
            }
        }

        // Found expired under the read lock; re-check under the write lock
        // because a concurrent put may have refreshed the entry.
        let mut entries = self.entries.write().expect("cache lock poisoned");
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(self.ttl) {
                return Some(entry.value.clone());
            }
            entries.remove(key);
            tracing::debug!("Cache entry expired for key {} in cache [{}]", key, self.name);
        }
        None
    }

    /// Inserts a value, unconditionally replacing any existing entry.
    pub fn put(&self, key: &str, value: T) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
        tracing::debug!("Cached value for key {} in cache [{}]", key, self.name);
    }

    /// Removes an entry, returning its value if one was present.
    pub fn remove(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.remove(key).map(|entry| {
            tracing::debug!("Removed key {} from cache [{}]", key, self.name);
            entry.value
        })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }
}

/// Periodic eviction of expired entries. Holds only a weak reference to
/// the map so the task winds down once the cache itself is dropped.
fn spawn_sweeper<T: Send + Sync + 'static>(
    name: &'static str,
    ttl: Duration,
    sweep_interval: Duration,
    entries: Weak<RwLock<HashMap<String, CacheEntry<T>>>>,
) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(sweep_interval);
        tick.tick().await; // first tick fires immediately
        loop {
            tick.tick().await;
            let Some(entries) = entries.upgrade() else {
                break;
            };
            let mut entries = entries.write().expect("cache lock poisoned");
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(ttl));
            let removed = before - entries.len();
            if removed > 0 {
                tracing::debug!("Swept {} expired entries from cache [{}]", removed, name);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    const TTL: Duration = Duration::from_millis(500);
    const SWEEP: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn get_returns_value_before_ttl() {
        let cache = TtlCache::new("test", TTL, SWEEP);
        cache.put("k", 42);

        advance(TTL - Duration::from_millis(1)).await;
        assert_eq!(cache.get("k"), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn get_after_ttl_is_a_miss_and_removes_the_entry() {
        let cache = TtlCache::new("test", TTL, SWEEP);
        cache.put("k", 42);

        advance(TTL + Duration::from_millis(1)).await;
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn put_overwrites_existing_entry() {
        let cache = TtlCache::new("test", TTL, SWEEP);
        cache.put("k", 1);
        advance(Duration::from_millis(400)).await;
        cache.put("k", 2);

        // Age is measured from the second put.
        advance(Duration::from_millis(400)).await;
        assert_eq!(cache.get("k"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn remove_returns_the_value() {
        let cache = TtlCache::new("test", TTL, SWEEP);
        cache.put("k", 42);

        assert_eq!(cache.remove("k"), Some(42));
        assert_eq!(cache.remove("k"), None);
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_evicts_expired_entries_without_a_get() {
        let cache = TtlCache::new("test", TTL, SWEEP);
        cache.put("k", 42);

        // Let the sweeper install its timer, then cross one sweep interval.
        tokio::task::yield_now().await;
        advance(TTL + SWEEP).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_keeps_live_entries() {
        let cache = TtlCache::new("test", Duration::from_secs(120), Duration::from_secs(30));
        cache.put("k", 42);

        tokio::task::yield_now().await;
        advance(Duration::from_secs(31)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.get("k"), Some(42));
    }
}
