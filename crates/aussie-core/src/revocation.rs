//! Revocation subsystem service (spec §4.5): ties the bloom filter and
//! local LRU cache in `aussie-cache` to the authoritative
//! `TokenRevocationRepository`, and fans out revoke events to other
//! instances via `RevocationEventPublisher` when pub/sub is enabled.

use std::sync::Arc;

use aussie_cache::{BloomParams, RevocationBloom, RevocationLocalCache};
use aussie_config::RevocationConfig;
use aussie_repository::{RepositoryResult, RevocationEvent, RevocationEventPublisher, TokenRevocationRepository};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

pub struct RevocationService {
    repo: Arc<dyn TokenRevocationRepository>,
    publisher: Option<Arc<dyn RevocationEventPublisher>>,
    bloom: RevocationBloom,
    cache: RevocationLocalCache,
    config: RevocationConfig,
}

impl RevocationService {
    pub fn new(
        repo: Arc<dyn TokenRevocationRepository>,
        publisher: Option<Arc<dyn RevocationEventPublisher>>,
        config: RevocationConfig,
    ) -> Self {
        let bloom = RevocationBloom::new(BloomParams {
            expected_insertions: config.bloom_filter.expected_insertions,
            false_positive_probability: config.bloom_filter.false_positive_probability,
        });
        let cache = RevocationLocalCache::new(
            config.cache.max_size as usize,
            std::time::Duration::from_secs(config.cache.ttl_secs),
        );
        Self {
            repo,
            publisher,
            bloom,
            cache,
            config,
        }
    }

    /// Full rebuild from the authoritative repository; run on startup
    /// and on `bloom_filter.rebuild_interval_secs`.
    pub async fn rebuild_bloom_filters(&self) -> RepositoryResult<()> {
        let jtis = self.repo.all_revoked_jtis().await?;
        let users = self.repo.all_revoked_users().await?;
        self.bloom.rebuild(
            jtis.into_iter().map(|(jti, _)| jti),
            users.into_iter().map(|(user, _, _)| user),
        );
        Ok(())
    }

    /// `isRevoked(jti, userId, iat, exp)` (spec §4.5): four tiers, each
    /// executing strictly in order, a positive answer short-circuiting.
    pub async fn is_revoked(
        &self,
        jti: Option<&str>,
        user_id: Option<&str>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }

        // Tier 0: TTL shortcut.
        let remaining = expires_at - Utc::now();
        if remaining < ChronoDuration::seconds(self.config.check_threshold_secs) {
            return false;
        }

        let check_user = self.config.check_user_revocation && user_id.is_some();

        // Tier 1: bloom filter.
        if self.config.bloom_filter.enabled {
            let jti_clear = jti
                .map(|j| self.bloom.jti_definitely_not_revoked(j))
                .unwrap_or(true);
            let user_clear = if check_user {
                self.bloom
                    .user_definitely_not_revoked(user_id.unwrap())
            } else {
                true
            };
            if jti_clear && user_clear {
                return false;
            }
        }

        // Tier 2: local cache.
        if self.config.cache.enabled {
            if let Some(jti) = jti {
                if self.cache.is_jti_revoked(jti) {
                    return true;
                }
            }
            if check_user {
                if self.cache.is_user_revoked(user_id.unwrap(), issued_at) {
                    return true;
                }
            }
        }

        // Tier 3: authoritative repository.
        if let Some(jti) = jti {
            match self.repo.is_revoked(jti).await {
                Ok(true) => {
                    self.cache.cache_jti_revoked(jti, expires_at);
                    return true;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "revocation repository query failed");
                    return false;
                }
            }
        }
        if check_user {
            let user = user_id.unwrap();
            match self.repo.is_user_revoked(user, issued_at).await {
                Ok(true) => {
                    // We don't know the authoritative `issuedBefore`/`expiresAt`
                    // pair here, so cache conservatively against the token's
                    // own expiry rather than guessing the revocation window.
                    self.cache.cache_user_revoked(user, issued_at + ChronoDuration::seconds(1), expires_at);
                    return true;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "revocation repository query failed");
                }
            }
        }

        false
    }

    pub async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> RepositoryResult<()> {
        self.repo.revoke(jti, expires_at).await?;
        self.bloom.insert_jti(jti);
        self.cache.cache_jti_revoked(jti, expires_at);
        if self.config.pubsub_enabled {
            if let Some(publisher) = &self.publisher {
                publisher
                    .publish(RevocationEvent::JtiRevoked {
                        jti: jti.to_string(),
                        expires_at,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn revoke_all_for_user(
        &self,
        user_id: &str,
        issued_before: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        self.repo
            .revoke_all_for_user(user_id, issued_before, expires_at)
            .await?;
        self.bloom.insert_user(user_id);
        self.cache.cache_user_revoked(user_id, issued_before, expires_at);
        if self.config.pubsub_enabled {
            if let Some(publisher) = &self.publisher {
                publisher
                    .publish(RevocationEvent::UserRevoked {
                        user_id: user_id.to_string(),
                        issued_before,
                        expires_at,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    /// Applies a revocation event received from another instance (spec
    /// §5 shared-resource policy: subscribers only touch their local
    /// bloom filter, never re-write the repository).
    pub fn apply_remote_event(&self, event: RevocationEvent) {
        match event {
            RevocationEvent::JtiRevoked { jti, expires_at } => {
                self.bloom.insert_jti(&jti);
                self.cache.cache_jti_revoked(&jti, expires_at);
            }
            RevocationEvent::UserRevoked {
                user_id,
                issued_before,
                expires_at,
            } => {
                self.bloom.insert_user(&user_id);
                self.cache.cache_user_revoked(&user_id, issued_before, expires_at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aussie_config::{BloomFilterConfig, RevocationCacheConfig};
    use aussie_repository::memory::InMemoryRevocationRepository;

    fn config() -> RevocationConfig {
        RevocationConfig {
            enabled: true,
            check_threshold_secs: 5,
            check_user_revocation: true,
            bloom_filter: BloomFilterConfig {
                enabled: true,
                expected_insertions: 1000,
                false_positive_probability: 0.001,
                rebuild_interval_secs: 3600,
            },
            cache: RevocationCacheConfig {
                enabled: true,
                max_size: 1000,
                ttl_secs: 300,
            },
            pubsub_enabled: false,
        }
    }

    #[tokio::test]
    async fn empty_bloom_never_calls_repository() {
        let repo = Arc::new(InMemoryRevocationRepository::new());
        let service = RevocationService::new(repo, None, config());
        service.rebuild_bloom_filters().await.unwrap();

        let revoked = service
            .is_revoked(
                Some("j1"),
                Some("u1"),
                Utc::now() - ChronoDuration::hours(1),
                Utc::now() + ChronoDuration::hours(1),
            )
            .await;
        assert!(!revoked);
    }

    #[tokio::test]
    async fn revoked_token_is_detected_and_cached() {
        let repo = Arc::new(InMemoryRevocationRepository::new());
        let service = RevocationService::new(repo, None, config());
        service.rebuild_bloom_filters().await.unwrap();

        let exp = Utc::now() + ChronoDuration::hours(1);
        service.revoke_token("j1", exp).await.unwrap();

        let revoked = service
            .is_revoked(Some("j1"), Some("u1"), Utc::now() - ChronoDuration::hours(1), exp)
            .await;
        assert!(revoked);
    }

    #[tokio::test]
    async fn disabled_bloom_filter_falls_through_to_repository() {
        let repo = Arc::new(InMemoryRevocationRepository::new());
        let mut cfg = config();
        cfg.bloom_filter.enabled = false;
        let service = RevocationService::new(repo, None, cfg);
        service.rebuild_bloom_filters().await.unwrap();

        let exp = Utc::now() + ChronoDuration::hours(1);
        service.revoke_token("j1", exp).await.unwrap();

        let revoked = service
            .is_revoked(Some("j1"), Some("u1"), Utc::now() - ChronoDuration::hours(1), exp)
            .await;
        assert!(revoked);
    }

    #[tokio::test]
    async fn disabled_local_cache_still_detects_via_repository() {
        let repo = Arc::new(InMemoryRevocationRepository::new());
        let mut cfg = config();
        cfg.cache.enabled = false;
        let service = RevocationService::new(repo, None, cfg);
        service.rebuild_bloom_filters().await.unwrap();

        let exp = Utc::now() + ChronoDuration::hours(1);
        service.revoke_token("j1", exp).await.unwrap();

        let revoked = service
            .is_revoked(Some("j1"), Some("u1"), Utc::now() - ChronoDuration::hours(1), exp)
            .await;
        assert!(revoked);
    }

    #[tokio::test]
    async fn near_expiry_token_is_never_checked() {
        let repo = Arc::new(InMemoryRevocationRepository::new());
        let service = RevocationService::new(repo.clone(), None, config());
        let exp = Utc::now() + ChronoDuration::seconds(1);
        repo.revoke("j1", exp + ChronoDuration::hours(1)).await.unwrap();

        let revoked = service
            .is_revoked(Some("j1"), None, Utc::now() - ChronoDuration::hours(1), exp)
            .await;
        assert!(!revoked);
    }
}
