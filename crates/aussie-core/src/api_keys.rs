//! API key service + bootstrap (spec §4.7). Key material never touches
//! the repository in plaintext: only the SHA-256 hex hash is stored,
//! and the plaintext is returned exactly once, at creation.

use std::collections::HashSet;
use std::sync::Arc;

use aussie_config::BootstrapConfig;
use aussie_crypto::hashing::{base64url_encode, random_bytes, random_hex, sha256_hex};
use aussie_repository::{ApiKeyRecord, ApiKeyRepository};
use chrono::{Duration, Utc};

use crate::error::{AuthError, AuthResult};

const ADMIN_PERMISSIONS: &[&str] = &["aussie:admin", "config:admin"];
const BOOTSTRAP_MAX_TTL_SECS: i64 = 24 * 3600;

/// Plaintext is only ever present in this struct, returned once from
/// `create`/`create_with_key`/`bootstrap`.
pub struct CreatedApiKey {
    pub plaintext: String,
    pub record: ApiKeyRecord,
}

pub struct ApiKeyService {
    repo: Arc<dyn ApiKeyRepository>,
    max_ttl_secs: Option<i64>,
}

impl ApiKeyService {
    pub fn new(repo: Arc<dyn ApiKeyRepository>, max_ttl_secs: Option<i64>) -> Self {
        Self { repo, max_ttl_secs }
    }

    /// Generates a fresh 32 random bytes (URL-safe base64, unpadded) key
    /// plus an independent 8-hex display id.
    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
        permissions: HashSet<String>,
        created_by: &str,
        ttl_secs: Option<i64>,
    ) -> AuthResult<CreatedApiKey> {
        let plaintext = base64url_encode(&random_bytes(32));
        self.create_with_key(name, description, permissions, created_by, ttl_secs, plaintext)
            .await
    }

    pub async fn create_with_key(
        &self,
        name: &str,
        description: Option<String>,
        permissions: HashSet<String>,
        created_by: &str,
        ttl_secs: Option<i64>,
        plaintext: String,
    ) -> AuthResult<CreatedApiKey> {
        let expires_at = self.resolve_expiry(ttl_secs)?;
        let record = ApiKeyRecord {
            key_id: random_hex(4),
            hash: sha256_hex(plaintext.as_bytes()),
            name: name.to_string(),
            description,
            permissions,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            expires_at,
            revoked: false,
        };
        self.repo.store(record.clone()).await?;
        Ok(CreatedApiKey { plaintext, record })
    }

    fn resolve_expiry(&self, ttl_secs: Option<i64>) -> AuthResult<Option<chrono::DateTime<Utc>>> {
        match (self.max_ttl_secs, ttl_secs) {
            (Some(_), None) => Err(AuthError::ValidationFailure(
                "TTL is required when a max TTL policy is configured".to_string(),
            )),
            (Some(max), Some(requested)) if requested > max => Err(AuthError::ValidationFailure(
                format!("requested TTL {requested}s exceeds max {max}s"),
            )),
            (_, Some(requested)) => Ok(Some(Utc::now() + Duration::seconds(requested))),
            (None, None) => Ok(None),
        }
    }

    /// Hashes `plaintext` and looks it up by hash; returns the record
    /// iff it exists and is valid (not revoked, not expired).
    pub async fn validate(&self, plaintext: &str) -> AuthResult<Option<ApiKeyRecord>> {
        let hash = sha256_hex(plaintext.as_bytes());
        let now = Utc::now();
        for record in self.repo.find_all().await? {
            if record.hash == hash {
                return Ok(if record.is_valid(now) { Some(record) } else { None });
            }
        }
        Ok(None)
    }

    pub async fn revoke(&self, key_id: &str) -> AuthResult<()> {
        Ok(self.repo.revoke(key_id).await?)
    }

    pub async fn should_bootstrap(&self, config: &BootstrapConfig) -> AuthResult<bool> {
        if !config.enabled {
            return Ok(false);
        }
        if config.recovery_mode {
            return Ok(true);
        }
        for record in self.repo.find_all().await? {
            if record.is_admin() && record.is_valid(Utc::now()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Requires an operator-supplied plaintext of at least 32 characters;
    /// clamps the requested TTL to at most 24 hours. Creates an admin
    /// key with the wildcard permission. Never auto-generates a key.
    pub async fn bootstrap(&self, config: &BootstrapConfig) -> AuthResult<CreatedApiKey> {
        use secrecy::ExposeSecret;
        let plaintext = config
            .key
            .as_ref()
            .map(|s| s.expose_secret().clone())
            .ok_or_else(|| {
                AuthError::StateViolation("bootstrap requested with no operator key".to_string())
            })?;
        if plaintext.len() < 32 {
            return Err(AuthError::ValidationFailure(
                "bootstrap key must be at least 32 characters".to_string(),
            ));
        }
        let ttl = config
            .ttl_secs
            .map(|t| t.min(BOOTSTRAP_MAX_TTL_SECS))
            .unwrap_or(BOOTSTRAP_MAX_TTL_SECS);

        self.create_with_key(
            "bootstrap-admin",
            Some("operator-seeded admin key".to_string()),
            HashSet::from(["*".to_string()]),
            "bootstrap",
            Some(ttl),
            plaintext,
        )
        .await
    }
}

pub fn is_admin_permission_set(permissions: &HashSet<String>) -> bool {
    permissions.contains("*") || ADMIN_PERMISSIONS.iter().any(|p| permissions.contains(*p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aussie_repository::memory::InMemoryApiKeyRepository;
    use secrecy::Secret;

    #[tokio::test]
    async fn create_then_validate_round_trips() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let service = ApiKeyService::new(repo, None);
        let created = service
            .create("ci-bot", None, HashSet::new(), "admin", None)
            .await
            .unwrap();
        let validated = service.validate(&created.plaintext).await.unwrap();
        assert!(validated.is_some());
    }

    #[tokio::test]
    async fn wrong_plaintext_does_not_validate() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let service = ApiKeyService::new(repo, None);
        service
            .create("ci-bot", None, HashSet::new(), "admin", None)
            .await
            .unwrap();
        assert!(service.validate("not-the-key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoked_key_no_longer_validates() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let service = ApiKeyService::new(repo, None);
        let created = service
            .create("ci-bot", None, HashSet::new(), "admin", None)
            .await
            .unwrap();
        service.revoke(&created.record.key_id).await.unwrap();
        assert!(service.validate(&created.plaintext).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ttl_required_when_max_ttl_policy_configured() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let service = ApiKeyService::new(repo, Some(3600));
        let result = service.create("ci-bot", None, HashSet::new(), "admin", None).await;
        assert!(matches!(result, Err(AuthError::ValidationFailure(_))));
    }

    #[tokio::test]
    async fn should_bootstrap_is_false_once_admin_key_exists() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let service = ApiKeyService::new(repo, None);
        let cfg = BootstrapConfig {
            enabled: true,
            recovery_mode: false,
            key: Some(Secret::new("x".repeat(40))),
            ttl_secs: None,
        };
        assert!(service.should_bootstrap(&cfg).await.unwrap());
        service.bootstrap(&cfg).await.unwrap();
        assert!(!service.should_bootstrap(&cfg).await.unwrap());
    }

    #[tokio::test]
    async fn bootstrap_rejects_short_keys() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let service = ApiKeyService::new(repo, None);
        let cfg = BootstrapConfig {
            enabled: true,
            recovery_mode: false,
            key: Some(Secret::new("too-short".to_string())),
            ttl_secs: None,
        };
        assert!(matches!(
            service.bootstrap(&cfg).await,
            Err(AuthError::ValidationFailure(_))
        ));
    }

    #[tokio::test]
    async fn bootstrap_clamps_ttl_to_24_hours() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let service = ApiKeyService::new(repo, None);
        let cfg = BootstrapConfig {
            enabled: true,
            recovery_mode: false,
            key: Some(Secret::new("x".repeat(40))),
            ttl_secs: Some(999_999),
        };
        let created = service.bootstrap(&cfg).await.unwrap();
        let expires_at = created.record.expires_at.unwrap();
        assert!(expires_at <= Utc::now() + Duration::hours(24) + Duration::seconds(5));
    }
}
