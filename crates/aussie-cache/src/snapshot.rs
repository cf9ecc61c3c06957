//! A TTL-guarded snapshot cache for the role/group mapping (spec
//! §4.9): "a reader never pairs a stale snapshot with a fresh expiry"
//! means the value and its expiry must be read and written together,
//! under one lock -- unlike the bloom filter's lock-free `ArcSwap`
//! (whose snapshot has no separate expiry to tear from).

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

struct State<T> {
    value: Option<T>,
    expires_at: Instant,
}

pub struct SnapshotCache<T: Clone> {
    state: Mutex<State<T>>,
    ttl: Duration,
}

impl<T: Clone> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                value: None,
                expires_at: Instant::now(),
            }),
            ttl,
        }
    }

    /// Returns the cached value if present and unexpired.
    pub fn get(&self) -> Option<T> {
        let guard = self.state.lock().unwrap();
        if guard.value.is_some() && guard.expires_at > Instant::now() {
            guard.value.clone()
        } else {
            None
        }
    }

    pub fn put(&self, value: T) {
        let mut guard = self.state.lock().unwrap();
        guard.value = Some(value);
        guard.expires_at = Instant::now() + self.ttl;
    }

    /// Invalidate so the next `get()` misses and the caller re-fetches.
    pub fn invalidate(&self) {
        let mut guard = self.state.lock().unwrap();
        guard.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expired_snapshot_is_not_returned() {
        let cache = SnapshotCache::new(Duration::from_secs(1));
        cache.put(42u32);
        assert_eq!(cache.get(), Some(42));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn invalidate_clears_immediately() {
        let cache = SnapshotCache::new(Duration::from_secs(60));
        cache.put("roles".to_string());
        cache.invalidate();
        assert_eq!(cache.get(), None);
    }
}
