//! Key rotation service (spec §4.3). Exposes idempotent methods the
//! host schedules; failures in scheduled steps are logged and
//! swallowed so one failing step never blocks another.

use std::sync::Arc;

use aussie_config::KeyRotationConfig;
use aussie_repository::KeyStatus;
use chrono::{Duration, Utc};

use crate::error::{AuthError, AuthResult};
use crate::signing_keys::{ActiveSigningKey, SigningKeyRegistry};

pub struct KeyRotationService {
    registry: Arc<SigningKeyRegistry>,
    config: KeyRotationConfig,
}

impl KeyRotationService {
    pub fn new(registry: Arc<SigningKeyRegistry>, config: KeyRotationConfig) -> Self {
        Self { registry, config }
    }

    /// Generates and registers a new key; activates immediately if the
    /// grace period is zero or negative, otherwise leaves it PENDING
    /// for `process_lifecycle` to promote later.
    pub async fn rotate(&self) -> AuthResult<String> {
        let key_id = self
            .registry
            .generate_and_register(self.config.key_size as usize)
            .await?;
        if self.config.grace_period_secs <= 0 {
            self.registry.activate(&key_id).await?;
        }
        Ok(key_id)
    }

    /// Three independent lifecycle steps, run in parallel. Each step's
    /// failure is logged and does not affect the others.
    pub async fn process_lifecycle(&self) {
        let (activate_result, retire_result, delete_result) = tokio::join!(
            self.activate_ready_pending(),
            self.retire_ready_deprecated(),
            self.delete_ready_retired(),
        );
        if let Err(e) = activate_result {
            tracing::warn!(error = %e, "key lifecycle: activation step failed");
        }
        if let Err(e) = retire_result {
            tracing::warn!(error = %e, "key lifecycle: retirement step failed");
        }
        if let Err(e) = delete_result {
            tracing::warn!(error = %e, "key lifecycle: deletion step failed");
        }
    }

    async fn activate_ready_pending(&self) -> AuthResult<()> {
        let cutoff = Utc::now() - Duration::seconds(self.config.grace_period_secs.max(0));
        let pending = self.registry.repo_find_by_status(KeyStatus::Pending).await?;
        let candidate = pending
            .into_iter()
            .filter(|k| k.created_at < cutoff)
            .max_by_key(|k| k.created_at);
        if let Some(key) = candidate {
            self.registry.activate(&key.key_id).await?;
        }
        Ok(())
    }

    async fn retire_ready_deprecated(&self) -> AuthResult<()> {
        let cutoff = Utc::now() - Duration::seconds(self.config.deprecation_period_secs.max(0));
        for key in self.registry.repo_find_by_status(KeyStatus::Deprecated).await? {
            if key.deprecated_at.map(|d| d < cutoff).unwrap_or(false) {
                self.registry.retire(&key.key_id).await?;
            }
        }
        Ok(())
    }

    async fn delete_ready_retired(&self) -> AuthResult<()> {
        let cutoff = Utc::now() - Duration::seconds(self.config.retention_period_secs.max(0));
        for key in self.registry.repo_find_by_status(KeyStatus::Retired).await? {
            if key.retired_at.map(|r| r < cutoff).unwrap_or(false) {
                self.registry.delete(&key.key_id).await?;
            }
        }
        Ok(())
    }

    /// Generates, registers, and activates immediately, returning the new
    /// active key. Unlike the scheduled steps, failures surface to the
    /// caller (spec §4.3).
    pub async fn trigger_rotation(&self, reason: &str) -> AuthResult<ActiveSigningKey> {
        if !self.config.enabled {
            return Err(AuthError::StateViolation(
                "key rotation disabled but rotation was requested".to_string(),
            ));
        }
        tracing::info!(reason, "triggering immediate key rotation");
        let key_id = self
            .registry
            .generate_and_register(self.config.key_size as usize)
            .await?;
        self.registry.activate(&key_id).await?;
        self.registry.current_signing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aussie_repository::memory::InMemorySigningKeyRepository;

    fn config() -> KeyRotationConfig {
        KeyRotationConfig {
            enabled: true,
            key_size: 2048,
            grace_period_secs: 0,
            deprecation_period_secs: 0,
            retention_period_secs: 0,
            cache_refresh_interval_secs: 60,
        }
    }

    #[tokio::test]
    async fn rotate_activates_immediately_when_grace_period_is_zero() {
        let repo = Arc::new(InMemorySigningKeyRepository::new());
        let registry = Arc::new(SigningKeyRegistry::new(repo));
        let service = KeyRotationService::new(registry.clone(), config());

        let key_id = service.rotate().await.unwrap();
        assert_eq!(registry.current_signing().unwrap().key_id, key_id);
    }

    #[tokio::test]
    async fn trigger_rotation_rejects_when_disabled() {
        let repo = Arc::new(InMemorySigningKeyRepository::new());
        let registry = Arc::new(SigningKeyRegistry::new(repo));
        let mut cfg = config();
        cfg.enabled = false;
        let service = KeyRotationService::new(registry, cfg);
        assert!(matches!(
            service.trigger_rotation("test").await,
            Err(AuthError::StateViolation(_))
        ));
    }

    #[tokio::test]
    async fn lifecycle_promotes_pending_key_past_grace_period() {
        let repo = Arc::new(InMemorySigningKeyRepository::new());
        let registry = Arc::new(SigningKeyRegistry::new(repo));
        let mut cfg = config();
        cfg.grace_period_secs = -1; // any pending key is immediately "ready"
        let service = KeyRotationService::new(registry.clone(), cfg);

        let key_id = service.rotate().await.unwrap();
        service.process_lifecycle().await;
        assert_eq!(registry.current_signing().unwrap().key_id, key_id);
    }
}
