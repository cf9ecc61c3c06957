//! Size- and TTL-bounded local revocation cache (spec §4.5, tier 2).
//! Grounded on the teacher's `lru = "0.12"` dependency (declared in
//! `auth-core/Cargo.toml` but unused there); generalized into the
//! jti/user revocation shapes spec.md names.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;

#[derive(Clone, Copy)]
struct JtiEntry {
    expires_at: DateTime<Utc>,
}

#[derive(Clone, Copy)]
struct UserEntry {
    issued_before: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

pub struct RevocationLocalCache {
    jti: Mutex<LruCache<String, JtiEntry>>,
    user: Mutex<LruCache<String, UserEntry>>,
    /// Upper bound on how long an entry is retained, even if the
    /// business-supplied expiry is further out.
    max_ttl: Duration,
}

impl RevocationLocalCache {
    pub fn new(max_size: usize, max_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_size.max(1)).unwrap();
        Self {
            jti: Mutex::new(LruCache::new(capacity)),
            user: Mutex::new(LruCache::new(capacity)),
            max_ttl,
        }
    }

    pub fn cache_jti_revoked(&self, jti: &str, expires_at: DateTime<Utc>) {
        let capped = self.cap(expires_at);
        self.jti
            .lock()
            .unwrap()
            .put(jti.to_string(), JtiEntry { expires_at: capped });
    }

    pub fn cache_user_revoked(
        &self,
        user_id: &str,
        issued_before: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) {
        let capped = self.cap(expires_at);
        self.user.lock().unwrap().put(
            user_id.to_string(),
            UserEntry {
                issued_before,
                expires_at: capped,
            },
        );
    }

    /// `true` if a cached jti revocation is still live. Purges the
    /// entry if it has expired.
    pub fn is_jti_revoked(&self, jti: &str) -> bool {
        let mut guard = self.jti.lock().unwrap();
        let Some(entry) = guard.get(jti).copied() else {
            return false;
        };
        if Utc::now() < entry.expires_at {
            true
        } else {
            guard.pop(jti);
            false
        }
    }

    /// `true` if a cached user-wide revocation applies to a token with
    /// the given `issued_at`.
    pub fn is_user_revoked(&self, user_id: &str, token_issued_at: DateTime<Utc>) -> bool {
        let mut guard = self.user.lock().unwrap();
        let Some(entry) = guard.get(user_id).copied() else {
            return false;
        };
        if Utc::now() >= entry.expires_at {
            guard.pop(user_id);
            return false;
        }
        token_issued_at < entry.issued_before
    }

    fn cap(&self, expires_at: DateTime<Utc>) -> DateTime<Utc> {
        let ceiling = Utc::now()
            + chrono::Duration::from_std(self.max_ttl).unwrap_or_else(|_| chrono::Duration::zero());
        expires_at.min(ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jti_revocation_is_cached_then_expires() {
        let cache = RevocationLocalCache::new(100, Duration::from_secs(3600));
        let exp = Utc::now() + chrono::Duration::milliseconds(20);
        cache.cache_jti_revoked("j1", exp);
        assert!(cache.is_jti_revoked("j1"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!cache.is_jti_revoked("j1"));
    }

    #[test]
    fn user_revocation_applies_only_to_earlier_tokens() {
        let cache = RevocationLocalCache::new(100, Duration::from_secs(3600));
        let issued_before = Utc::now();
        let exp = Utc::now() + chrono::Duration::seconds(60);
        cache.cache_user_revoked("u1", issued_before, exp);

        let old_token_iat = issued_before - chrono::Duration::seconds(10);
        let new_token_iat = issued_before + chrono::Duration::seconds(10);

        assert!(cache.is_user_revoked("u1", old_token_iat));
        assert!(!cache.is_user_revoked("u1", new_token_iat));
    }

    #[test]
    fn entry_ttl_is_capped_by_max_ttl_not_business_expiry() {
        let cache = RevocationLocalCache::new(100, Duration::from_millis(20));
        let far_future = Utc::now() + chrono::Duration::days(365);
        cache.cache_jti_revoked("j1", far_future);
        assert!(cache.is_jti_revoked("j1"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!cache.is_jti_revoked("j1"));
    }
}
