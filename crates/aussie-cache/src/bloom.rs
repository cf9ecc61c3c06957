//! Revocation bloom filters (spec §4.5). Two independent filters (JTI,
//! user) behind a volatile `ArcSwap` snapshot: reads never take a lock,
//! writes are serialized by a single mutex and publish a freshly built
//! filter. Grounded on the teacher's pattern of swapping whole
//! snapshots (`auth-crypto::KeyManager`'s `RwLock<EncodingKey>`,
//! generalized here to a lock-free reader path), using `bloomfilter`
//! (seen in `other_examples/manifests/whispem-minikv/Cargo.toml`).

use std::sync::Mutex;

use arc_swap::ArcSwap;
use bloomfilter::Bloom;

#[derive(Clone, Copy)]
pub struct BloomParams {
    pub expected_insertions: usize,
    pub false_positive_probability: f64,
}

struct Filters {
    jti: Option<Bloom<str>>,
    user: Option<Bloom<str>>,
}

/// `definitely_not_revoked(x) <=> !might_contain(x)`. Until the filter
/// has been built at least once, every lookup conservatively reports
/// "might be revoked".
pub struct RevocationBloom {
    snapshot: ArcSwap<Filters>,
    write_lock: Mutex<()>,
    params: BloomParams,
}

impl RevocationBloom {
    pub fn new(params: BloomParams) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Filters {
                jti: None,
                user: None,
            }),
            write_lock: Mutex::new(()),
            params,
        }
    }

    pub fn jti_definitely_not_revoked(&self, jti: &str) -> bool {
        match &self.snapshot.load().jti {
            Some(bloom) => !bloom.check(jti),
            None => false,
        }
    }

    pub fn user_definitely_not_revoked(&self, user_id: &str) -> bool {
        match &self.snapshot.load().user {
            Some(bloom) => !bloom.check(user_id),
            None => false,
        }
    }

    /// Full rebuild from an authoritative source, run on startup and on
    /// a schedule.
    pub fn rebuild(&self, jtis: impl Iterator<Item = String>, users: impl Iterator<Item = String>) {
        let _guard = self.write_lock.lock().unwrap();
        let mut jti_bloom = self.fresh_bloom();
        for jti in jtis {
            jti_bloom.set(jti.as_str());
        }
        let mut user_bloom = self.fresh_bloom();
        for user in users {
            user_bloom.set(user.as_str());
        }
        self.snapshot.store(std::sync::Arc::new(Filters {
            jti: Some(jti_bloom),
            user: Some(user_bloom),
        }));
    }

    /// Incremental insert on a single revocation event, without a full
    /// rebuild. Clones the current filter under the write lock, inserts,
    /// and swaps the published snapshot.
    pub fn insert_jti(&self, jti: &str) {
        let _guard = self.write_lock.lock().unwrap();
        let current = self.snapshot.load_full();
        let mut jti_bloom = current.jti.clone().unwrap_or_else(|| self.fresh_bloom());
        jti_bloom.set(jti);
        self.snapshot.store(std::sync::Arc::new(Filters {
            jti: Some(jti_bloom),
            user: current.user.clone(),
        }));
    }

    pub fn insert_user(&self, user_id: &str) {
        let _guard = self.write_lock.lock().unwrap();
        let current = self.snapshot.load_full();
        let mut user_bloom = current.user.clone().unwrap_or_else(|| self.fresh_bloom());
        user_bloom.set(user_id);
        self.snapshot.store(std::sync::Arc::new(Filters {
            jti: current.jti.clone(),
            user: Some(user_bloom),
        }));
    }

    fn fresh_bloom(&self) -> Bloom<str> {
        Bloom::new_for_fp_rate(
            self.params.expected_insertions,
            self.params.false_positive_probability,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BloomParams {
        BloomParams {
            expected_insertions: 1000,
            false_positive_probability: 0.001,
        }
    }

    #[test]
    fn uninitialized_filter_is_conservative() {
        let bloom = RevocationBloom::new(params());
        assert!(!bloom.jti_definitely_not_revoked("any-jti"));
        assert!(!bloom.user_definitely_not_revoked("any-user"));
    }

    #[test]
    fn empty_built_filter_clears_unknown_entries() {
        let bloom = RevocationBloom::new(params());
        bloom.rebuild(std::iter::empty(), std::iter::empty());
        assert!(bloom.jti_definitely_not_revoked("not-in-set"));
    }

    #[test]
    fn inserted_jti_is_found() {
        let bloom = RevocationBloom::new(params());
        bloom.rebuild(std::iter::empty(), std::iter::empty());
        bloom.insert_jti("revoked-jti");
        assert!(!bloom.jti_definitely_not_revoked("revoked-jti"));
    }

    #[test]
    fn incremental_insert_preserves_other_filter() {
        let bloom = RevocationBloom::new(params());
        bloom.rebuild(std::iter::empty(), std::iter::empty());
        bloom.insert_user("revoked-user");
        // jti filter should remain empty-but-initialized, not reset to conservative.
        assert!(bloom.jti_definitely_not_revoked("some-jti"));
        assert!(!bloom.user_definitely_not_revoked("revoked-user"));
    }
}
