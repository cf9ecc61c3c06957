//! Generic size/TTL-bounded keyed cache, used for claims-translation
//! results keyed by token identity (spec §4.9).

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct KeyedTtlCache<V: Clone> {
    inner: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> KeyedTtlCache<V> {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(NonZeroUsize::new(max_size.max(1)).unwrap())),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.inner.lock().unwrap();
        let entry = guard.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.value.clone())
        } else {
            guard.pop(key);
            None
        }
    }

    pub fn put(&self, key: String, value: V) {
        let mut guard = self.inner.lock().unwrap();
        guard.put(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.lock().unwrap().pop(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache: KeyedTtlCache<String> = KeyedTtlCache::new(10, Duration::from_secs(60));
        cache.put("jti-1".to_string(), "translated".to_string());
        assert_eq!(cache.get("jti-1"), Some("translated".to_string()));
    }

    #[test]
    fn missing_key_returns_none() {
        let cache: KeyedTtlCache<String> = KeyedTtlCache::new(10, Duration::from_secs(60));
        assert_eq!(cache.get("missing"), None);
    }
}
