//! Auth rate-limit / lockout service (spec §4.6). Keys are built from
//! two independent axes -- `ip:<addr>` and one of `user:<id>` or
//! `apikey:<prefix>` -- both checked independently, the more severe
//! outcome winning. Grounded on the teacher's
//! `services::rate_limiter::RateLimiter` shape, generalized to
//! repository-backed storage, a bounded failure window, and progressive
//! lockout.

use std::sync::Arc;

use aussie_config::RateLimitConfig;
use aussie_repository::{FailedAttemptRepository, LockoutRecord};
use chrono::{Duration, Utc};

use crate::models::{FailedAttemptOutcome, LockoutCheck};

pub fn ip_key(addr: &str) -> String {
    format!("ip:{addr}")
}

pub fn user_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

pub fn api_key_key(key_prefix: &str) -> String {
    format!("apikey:{key_prefix}")
}

pub struct AuthRateLimiter {
    repo: Arc<dyn FailedAttemptRepository>,
    config: RateLimitConfig,
}

impl AuthRateLimiter {
    pub fn new(repo: Arc<dyn FailedAttemptRepository>, config: RateLimitConfig) -> Self {
        Self { repo, config }
    }

    /// Checks the IP key first, then the identifier key; the first
    /// blocking one short-circuits. A disabled service always allows.
    pub async fn check_auth_limit(&self, ip: &str, identifier_key: &str) -> LockoutCheck {
        if !self.config.enabled {
            return LockoutCheck::Allow;
        }
        if self.config.track_by_ip {
            if let Some(block) = self.check_one(&ip_key(ip)).await {
                return block;
            }
        }
        if self.config.track_by_identifier {
            if let Some(block) = self.check_one(identifier_key).await {
                return block;
            }
        }
        LockoutCheck::Allow
    }

    async fn check_one(&self, key: &str) -> Option<LockoutCheck> {
        match self.repo.get_lockout(key).await {
            Ok(Some(lockout)) if lockout.expires_at > Utc::now() => Some(LockoutCheck::Block {
                key: key.to_string(),
                retry_after_secs: (lockout.expires_at - Utc::now()).num_seconds().max(0),
                lockout_expiry: lockout.expires_at,
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, key, "lockout lookup failed; allowing by default");
                None
            }
        }
    }

    /// Increments the counter for each tracked axis; if a counter
    /// reaches `max_failed_attempts`, computes the progressive lockout
    /// duration and stores it. Returns the more severe of the two axis
    /// outcomes.
    pub async fn record_failed_attempt(
        &self,
        ip: &str,
        identifier_key: &str,
        reason: &str,
    ) -> FailedAttemptOutcome {
        let mut outcomes = Vec::new();
        if self.config.track_by_ip {
            outcomes.push(self.record_one(&ip_key(ip), reason).await);
        }
        if self.config.track_by_identifier {
            outcomes.push(self.record_one(identifier_key, reason).await);
        }

        outcomes
            .into_iter()
            .reduce(|a, b| match (&a, &b) {
                (FailedAttemptOutcome::Locked { .. }, _) => a,
                (_, FailedAttemptOutcome::Locked { .. }) => b,
                (
                    FailedAttemptOutcome::NotLocked { attempts: a_att, .. },
                    FailedAttemptOutcome::NotLocked { attempts: b_att, .. },
                ) => {
                    if a_att >= b_att {
                        a
                    } else {
                        b
                    }
                }
            })
            .unwrap_or(FailedAttemptOutcome::NotLocked {
                attempts: 0,
                remaining: self.config.max_failed_attempts,
            })
    }

    async fn record_one(&self, key: &str, reason: &str) -> FailedAttemptOutcome {
        let now = Utc::now();
        let window = Duration::seconds(self.config.failed_attempt_window_secs as i64);
        let record = match self.repo.record_failure(key, now, window).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, key, "failed to record auth failure; best-effort, not blocking");
                return FailedAttemptOutcome::NotLocked {
                    attempts: 0,
                    remaining: self.config.max_failed_attempts,
                };
            }
        };

        if record.count < self.config.max_failed_attempts {
            return FailedAttemptOutcome::NotLocked {
                attempts: record.count,
                remaining: self.config.max_failed_attempts.saturating_sub(record.count),
            };
        }

        let prior_lockout_count = self
            .repo
            .get_lockout(key)
            .await
            .ok()
            .flatten()
            .map(|l| l.lockout_count)
            .unwrap_or(0);

        let duration_secs = progressive_lockout_seconds(
            self.config.lockout_duration_secs as i64,
            self.config.progressive_lockout_multiplier,
            self.config.max_lockout_duration_secs as i64,
            prior_lockout_count,
        );

        let now = Utc::now();
        let lockout = LockoutRecord {
            key: key.to_string(),
            locked_at: now,
            expires_at: now + Duration::seconds(duration_secs),
            reason: reason.to_string(),
            lockout_count: prior_lockout_count + 1,
        };
        if let Err(e) = self.repo.set_lockout(lockout).await {
            tracing::warn!(error = %e, key, "failed to persist lockout");
        }

        FailedAttemptOutcome::Locked {
            key: key.to_string(),
            attempts: record.count,
            lockout_seconds: duration_secs,
        }
    }

    pub async fn clear_failed_attempts(&self, ip: &str, identifier_key: &str) {
        if self.config.track_by_ip {
            let _ = self.repo.clear(&ip_key(ip)).await;
        }
        if self.config.track_by_identifier {
            let _ = self.repo.clear(identifier_key).await;
        }
    }

    pub async fn clear_lockout(&self, key: &str) {
        let _ = self.repo.clear_lockout(key).await;
        let _ = self.repo.clear(key).await;
    }
}

/// `min(base * multiplier^lockoutCount, max)`. If `multiplier <= 1.0`,
/// use `base` unconditionally (spec §4.6).
fn progressive_lockout_seconds(base: i64, multiplier: f64, max: i64, lockout_count: u32) -> i64 {
    if multiplier <= 1.0 {
        return base.min(max);
    }
    let computed = (base as f64) * multiplier.powi(lockout_count as i32);
    (computed.min(max as f64)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use aussie_repository::memory::InMemoryFailedAttemptRepository;

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_failed_attempts: 5,
            failed_attempt_window_secs: 900,
            lockout_duration_secs: 900,
            max_lockout_duration_secs: 86_400,
            progressive_lockout_multiplier: 1.5,
            track_by_ip: true,
            track_by_identifier: true,
        }
    }

    #[tokio::test]
    async fn fifth_failure_locks_out() {
        let repo = Arc::new(InMemoryFailedAttemptRepository::new());
        let limiter = AuthRateLimiter::new(repo, config());
        let ip = "192.168.1.1";
        let user = user_key("u1");

        for _ in 0..4 {
            let outcome = limiter.record_failed_attempt(ip, &user, "bad password").await;
            assert!(matches!(outcome, FailedAttemptOutcome::NotLocked { .. }));
        }
        let fifth = limiter.record_failed_attempt(ip, &user, "bad password").await;
        match fifth {
            FailedAttemptOutcome::Locked { lockout_seconds, .. } => {
                assert!(lockout_seconds >= 900);
            }
            other => panic!("expected Locked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn progressive_duration_uses_prior_lockout_count() {
        assert_eq!(progressive_lockout_seconds(900, 1.5, 86_400, 0), 900);
        assert_eq!(progressive_lockout_seconds(900, 1.5, 86_400, 1), 1350);
    }

    #[test]
    fn progressive_duration_is_capped_by_max() {
        // base=15m, multiplier=1.5, max=1h, prior lockoutCount=10 (spec scenario 5).
        assert_eq!(progressive_lockout_seconds(900, 1.5, 3_600, 10), 3_600);
    }

    #[tokio::test]
    async fn check_auth_limit_allows_after_clear() {
        let repo = Arc::new(InMemoryFailedAttemptRepository::new());
        let limiter = AuthRateLimiter::new(repo, config());
        let ip = "10.0.0.1";
        let user = user_key("u2");
        for _ in 0..5 {
            limiter.record_failed_attempt(ip, &user, "bad password").await;
        }
        assert!(matches!(
            limiter.check_auth_limit(ip, &user).await,
            LockoutCheck::Block { .. }
        ));
        limiter.clear_lockout(&ip_key(ip)).await;
        assert_eq!(limiter.check_auth_limit(ip, &user).await, LockoutCheck::Allow);
    }
}
