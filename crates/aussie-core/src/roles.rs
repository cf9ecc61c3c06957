//! Role/Group mapping and claims translation (spec §4.9). Roles and
//! groups share a storage shape (`RoleOrGroup`) but are exposed through
//! two distinct repositories and two distinct services, mirroring the
//! spec's "a service for roles and another for groups".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aussie_cache::{KeyedTtlCache, SnapshotCache};
use aussie_config::TranslationConfig;
use aussie_repository::{GroupRepository, RoleOrGroup, RoleRepository, TranslationConfigRepository};

use crate::error::AuthResult;
use crate::models::TranslatedClaims;

/// Generic over which repository trait backs it; `RoleService` and
/// `GroupService` below are thin aliases that plug in their trait
/// object. Snapshot reads publish under a lock (`SnapshotCache`); a
/// miss re-fetches from the repository and republishes.
pub struct RoleMappingService<R: ?Sized> {
    repo: Arc<R>,
    snapshot: SnapshotCache<Arc<HashMap<String, RoleOrGroup>>>,
}

impl<R: ?Sized> RoleMappingService<R> {
    pub fn new(repo: Arc<R>, snapshot_ttl: Duration) -> Self {
        Self {
            repo,
            snapshot: SnapshotCache::new(snapshot_ttl),
        }
    }
}

macro_rules! impl_mapping_service {
    ($repo_trait:ident, $label:literal) => {
        impl RoleMappingService<dyn $repo_trait> {
            pub async fn find_by_id(&self, id: &str) -> AuthResult<Option<RoleOrGroup>> {
                Ok(self.repo.find_by_id(id).await?)
            }

            pub async fn find_all(&self) -> AuthResult<Vec<RoleOrGroup>> {
                Ok(self.repo.find_all().await?)
            }

            pub async fn store(&self, entry: RoleOrGroup) -> AuthResult<()> {
                self.repo.store(entry).await?;
                self.snapshot.invalidate();
                Ok(())
            }

            async fn snapshot_map(&self) -> AuthResult<Arc<HashMap<String, RoleOrGroup>>> {
                if let Some(cached) = self.snapshot.get() {
                    return Ok(cached);
                }
                let all = self.repo.find_all().await?;
                let map = Arc::new(
                    all.into_iter()
                        .map(|entry| (entry.id.clone(), entry))
                        .collect::<HashMap<_, _>>(),
                );
                self.snapshot.put(map.clone());
                Ok(map)
            }

            /// Union of permissions across the given ids; unknown ids
            /// are silently ignored (spec §4.9).
            pub async fn expand(&self, ids: &[String]) -> AuthResult<HashSet<String>> {
                let map = self.snapshot_map().await?;
                let mut out = HashSet::new();
                for id in ids {
                    if let Some(entry) = map.get(id) {
                        out.extend(entry.permissions.iter().cloned());
                    } else {
                        tracing::debug!(id, kind = $label, "expand: unknown id ignored");
                    }
                }
                Ok(out)
            }
        }
    };
}

impl_mapping_service!(RoleRepository, "role");
impl_mapping_service!(GroupRepository, "group");

pub type RoleService = RoleMappingService<dyn RoleRepository>;
pub type GroupService = RoleMappingService<dyn GroupRepository>;

/// A claims translation provider converts raw IdP claims into
/// `{roles, permissions, extra}` (spec §4.9).
#[async_trait]
pub trait ClaimsTranslationProvider: Send + Sync {
    fn name(&self) -> &str;
    fn priority(&self) -> i32;
    async fn translate(
        &self,
        raw_claims: &HashMap<String, serde_json::Value>,
        provider_config: &serde_json::Value,
    ) -> TranslatedClaims;
}

/// Passes through `roles`/`permissions` claims verbatim if present,
/// putting everything else into `extra`. The baseline provider used
/// when no custom mapping is configured.
pub struct PassthroughClaimsProvider;

#[async_trait]
impl ClaimsTranslationProvider for PassthroughClaimsProvider {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn priority(&self) -> i32 {
        0
    }

    async fn translate(
        &self,
        raw_claims: &HashMap<String, serde_json::Value>,
        _provider_config: &serde_json::Value,
    ) -> TranslatedClaims {
        let string_array = |key: &str| -> Vec<String> {
            match raw_claims.get(key) {
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                Some(serde_json::Value::String(s)) => vec![s.clone()],
                _ => Vec::new(),
            }
        };
        let extra = raw_claims
            .iter()
            .filter(|(k, _)| k.as_str() != "roles" && k.as_str() != "permissions")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        TranslatedClaims {
            roles: string_array("roles"),
            permissions: string_array("permissions"),
            extra,
        }
    }
}

pub struct ClaimsTranslationService {
    config_repo: Arc<dyn TranslationConfigRepository>,
    providers: Vec<Arc<dyn ClaimsTranslationProvider>>,
    cache: KeyedTtlCache<TranslatedClaims>,
    config: TranslationConfig,
}

impl ClaimsTranslationService {
    pub fn new(
        config_repo: Arc<dyn TranslationConfigRepository>,
        providers: Vec<Arc<dyn ClaimsTranslationProvider>>,
        config: TranslationConfig,
    ) -> Self {
        let cache = KeyedTtlCache::new(
            config.cache.max_size as usize,
            Duration::from_secs(config.cache.ttl_secs),
        );
        Self {
            config_repo,
            providers,
            cache,
            config,
        }
    }

    fn cache_key(&self, raw_claims: &HashMap<String, serde_json::Value>) -> String {
        if let Some(jti) = raw_claims.get("jti").and_then(|v| v.as_str()) {
            return jti.to_string();
        }
        let issuer = raw_claims.get("iss").and_then(|v| v.as_str()).unwrap_or("");
        let subject = raw_claims.get("sub").and_then(|v| v.as_str()).unwrap_or("");
        let iat = raw_claims.get("iat").and_then(|v| v.as_i64()).unwrap_or(0);
        format!("{issuer}:{subject}:{iat}")
    }

    /// Picks the configured-by-name provider if set and present,
    /// otherwise the highest-priority one available.
    fn select_provider(&self) -> Option<&Arc<dyn ClaimsTranslationProvider>> {
        if let Some(name) = &self.config.provider {
            if let Some(p) = self.providers.iter().find(|p| p.name() == name) {
                return Some(p);
            }
        }
        self.providers.iter().max_by_key(|p| p.priority())
    }

    pub async fn translate(
        &self,
        raw_claims: &HashMap<String, serde_json::Value>,
    ) -> AuthResult<TranslatedClaims> {
        if !self.config.enabled {
            return Ok(TranslatedClaims {
                roles: Vec::new(),
                permissions: Vec::new(),
                extra: HashMap::new(),
            });
        }

        let key = self.cache_key(raw_claims);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let provider = match self.select_provider() {
            Some(p) => p.clone(),
            None => {
                return Ok(TranslatedClaims {
                    roles: Vec::new(),
                    permissions: Vec::new(),
                    extra: raw_claims.clone(),
                })
            }
        };

        let provider_config = self
            .config_repo
            .find_all_enabled()
            .await?
            .into_iter()
            .find(|c| c.provider_name == provider.name())
            .map(|c| c.config)
            .unwrap_or(serde_json::Value::Null);

        let translated = provider.translate(raw_claims, &provider_config).await;
        self.cache.put(key, translated.clone());
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aussie_repository::memory::{InMemoryRoleOrGroupStore, InMemoryTranslationConfigRepository};
    use chrono::Utc;

    fn sample_role(id: &str, perms: &[&str]) -> RoleOrGroup {
        let now = Utc::now();
        RoleOrGroup {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            permissions: perms.iter().map(|p| p.to_string()).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn expand_unions_permissions_and_ignores_unknown_ids() {
        let store: Arc<dyn RoleRepository> = Arc::new(InMemoryRoleOrGroupStore::new());
        store.store(sample_role("r1", &["a", "b"])).await.unwrap();
        store.store(sample_role("r2", &["b", "c"])).await.unwrap();

        let service = RoleService::new(store, Duration::from_secs(60));
        let expanded = service
            .expand(&["r1".to_string(), "r2".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(expanded, HashSet::from(["a".to_string(), "b".to_string(), "c".to_string()]));
    }

    #[tokio::test]
    async fn store_invalidates_snapshot() {
        let store: Arc<dyn RoleRepository> = Arc::new(InMemoryRoleOrGroupStore::new());
        let service = RoleService::new(store, Duration::from_secs(60));
        assert!(service.expand(&["r1".to_string()]).await.unwrap().is_empty());

        service.store(sample_role("r1", &["x"])).await.unwrap();
        let expanded = service.expand(&["r1".to_string()]).await.unwrap();
        assert_eq!(expanded, HashSet::from(["x".to_string()]));
    }

    fn translation_config() -> TranslationConfig {
        TranslationConfig {
            enabled: true,
            provider: None,
            cache: aussie_config::TranslationCacheConfig {
                ttl_secs: 300,
                max_size: 100,
            },
        }
    }

    #[tokio::test]
    async fn passthrough_provider_extracts_roles_and_permissions() {
        let config_repo = Arc::new(InMemoryTranslationConfigRepository::new());
        let service = ClaimsTranslationService::new(
            config_repo,
            vec![Arc::new(PassthroughClaimsProvider)],
            translation_config(),
        );
        let mut claims = HashMap::new();
        claims.insert("roles".to_string(), serde_json::json!(["admin", "viewer"]));
        claims.insert("jti".to_string(), serde_json::json!("tok-1"));

        let translated = service.translate(&claims).await.unwrap();
        assert_eq!(translated.roles, vec!["admin".to_string(), "viewer".to_string()]);
    }

    #[tokio::test]
    async fn translation_result_is_cached_by_jti() {
        let config_repo = Arc::new(InMemoryTranslationConfigRepository::new());
        let service = ClaimsTranslationService::new(
            config_repo,
            vec![Arc::new(PassthroughClaimsProvider)],
            translation_config(),
        );
        let mut claims = HashMap::new();
        claims.insert("jti".to_string(), serde_json::json!("tok-2"));
        claims.insert("roles".to_string(), serde_json::json!("admin"));

        let first = service.translate(&claims).await.unwrap();
        claims.insert("roles".to_string(), serde_json::json!("changed"));
        let second = service.translate(&claims).await.unwrap();
        assert_eq!(first.roles, second.roles);
    }

    #[tokio::test]
    async fn disabled_translation_returns_empty() {
        let config_repo = Arc::new(InMemoryTranslationConfigRepository::new());
        let mut config = translation_config();
        config.enabled = false;
        let service =
            ClaimsTranslationService::new(config_repo, vec![Arc::new(PassthroughClaimsProvider)], config);
        let mut claims = HashMap::new();
        claims.insert("roles".to_string(), serde_json::json!(["admin"]));
        let translated = service.translate(&claims).await.unwrap();
        assert!(translated.roles.is_empty());
    }
}
