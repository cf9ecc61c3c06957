//! Token issuance (spec §4.10): re-signs a validated external identity
//! into a short-lived internal token, optionally enriched with the
//! expanded permission set. Mirrors the explicit-registration plugin
//! pattern spec §9 calls for in the validator and claims-translation
//! registries: an `IssuerPlugin` trait, selected by highest priority
//! among those that claim availability (no named override is exposed
//! here since only one concrete issuer -- JWS -- exists in this repo).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aussie_config::IssuanceConfig;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::error::{AuthError, AuthResult};
use crate::models::{TranslatedClaims, ValidatedToken};
use crate::roles::RoleService;
use crate::signing_keys::SigningKeyRegistry;

/// Claims handed to an `IssuerPlugin` after forwarding and enrichment.
pub struct EnrichedClaims {
    pub subject: String,
    pub issuer: String,
    pub forwarded: HashMap<String, Value>,
    pub effective_permissions: Vec<String>,
    pub audience: Option<String>,
}

#[async_trait]
pub trait IssuerPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn priority(&self) -> i32;
    fn is_available(&self) -> bool;
    async fn issue(
        &self,
        claims: &EnrichedClaims,
        registry: &SigningKeyRegistry,
        config: &IssuanceConfig,
    ) -> AuthResult<String>;
}

/// Signs a compact JWS using the registry's current active key,
/// embedding `effective_permissions` alongside the forwarded claims.
pub struct JwsIssuerPlugin;

#[async_trait]
impl IssuerPlugin for JwsIssuerPlugin {
    fn name(&self) -> &str {
        "jws"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn issue(
        &self,
        claims: &EnrichedClaims,
        registry: &SigningKeyRegistry,
        config: &IssuanceConfig,
    ) -> AuthResult<String> {
        let active = registry.current_signing()?;
        let now = Utc::now();
        let ttl = config.token_ttl_secs.min(config.max_token_ttl_secs).max(0);

        let mut payload: HashMap<String, Value> = claims.forwarded.clone();
        payload.insert("sub".to_string(), Value::String(claims.subject.clone()));
        payload.insert("iss".to_string(), Value::String(config.issuer.clone()));
        payload.insert("iat".to_string(), Value::from(now.timestamp()));
        payload.insert(
            "exp".to_string(),
            Value::from((now + Duration::seconds(ttl)).timestamp()),
        );
        if let Some(aud) = &claims.audience {
            payload.insert("aud".to_string(), Value::String(aud.clone()));
        }
        payload.insert(
            "effective_permissions".to_string(),
            Value::from(claims.effective_permissions.clone()),
        );

        aussie_crypto::jws::sign(&payload, &active.encoding_key, &active.key_id)
            .map_err(AuthError::SigningFailure)
    }
}

pub struct TokenIssuer {
    registry: Arc<SigningKeyRegistry>,
    roles: Option<Arc<RoleService>>,
    plugins: Vec<Arc<dyn IssuerPlugin>>,
    config: IssuanceConfig,
    service_id: String,
}

impl TokenIssuer {
    pub fn new(
        registry: Arc<SigningKeyRegistry>,
        roles: Option<Arc<RoleService>>,
        plugins: Vec<Arc<dyn IssuerPlugin>>,
        config: IssuanceConfig,
        service_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            roles,
            plugins,
            config,
            service_id: service_id.into(),
        }
    }

    fn select_plugin(&self) -> Option<&Arc<dyn IssuerPlugin>> {
        self.plugins
            .iter()
            .filter(|p| p.is_available())
            .max_by_key(|p| p.priority())
    }

    /// Effective audience: `routeAudience ?? defaultAudience ?? (requireAudience ? serviceId : none)`.
    fn effective_audience(&self, route_audience: Option<&str>) -> Option<String> {
        route_audience
            .map(str::to_string)
            .or_else(|| self.config.default_audience.clone())
            .or_else(|| {
                if self.config.require_audience {
                    Some(self.service_id.clone())
                } else {
                    None
                }
            })
    }

    /// Re-signs a `Valid` token result into an internal token. Returns
    /// `None` ("absent") if the input isn't `Valid`, or no issuer
    /// plugin is available.
    pub async fn issue(
        &self,
        validated: &ValidatedToken,
        route_audience: Option<&str>,
        translated: Option<&TranslatedClaims>,
    ) -> AuthResult<Option<String>> {
        let ValidatedToken::Valid {
            subject,
            issuer: _,
            claims,
            expires_at: _,
        } = validated
        else {
            return Ok(None);
        };

        let Some(plugin) = self.select_plugin() else {
            return Ok(None);
        };

        let effective_permissions = self.expand_effective_permissions(claims, translated).await?;

        let forwarded = self
            .config
            .forwarded_claims
            .iter()
            .filter_map(|name| claims.get(name).map(|v| (name.clone(), v.clone())))
            .collect();

        let enriched = EnrichedClaims {
            subject: subject.clone(),
            issuer: self.config.issuer.clone(),
            forwarded,
            effective_permissions,
            audience: self.effective_audience(route_audience),
        };

        Ok(Some(plugin.issue(&enriched, &self.registry, &self.config).await?))
    }

    /// If `claims.roles` is present (array or single string), expands it
    /// via the role mapping; unions in any permissions the claims
    /// translation step already resolved directly.
    async fn expand_effective_permissions(
        &self,
        claims: &HashMap<String, Value>,
        translated: Option<&TranslatedClaims>,
    ) -> AuthResult<Vec<String>> {
        let mut effective: std::collections::HashSet<String> = std::collections::HashSet::new();

        if let Some(translated) = translated {
            effective.extend(translated.permissions.iter().cloned());
            if let Some(roles) = &self.roles {
                effective.extend(roles.expand(&translated.roles).await?);
            }
        } else if let Some(roles_value) = claims.get("roles") {
            let role_ids = match roles_value {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect::<Vec<_>>(),
                Value::String(s) => vec![s.clone()],
                _ => Vec::new(),
            };
            if let Some(roles) = &self.roles {
                effective.extend(roles.expand(&role_ids).await?);
            }
        }

        let mut out: Vec<String> = effective.into_iter().collect();
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aussie_config::IssuanceConfig;
    use aussie_repository::memory::{InMemoryRoleOrGroupStore, InMemorySigningKeyRepository};
    use aussie_repository::RoleOrGroup;
    use std::collections::HashSet;
    use std::time::Duration as StdDuration;

    fn config() -> IssuanceConfig {
        IssuanceConfig {
            issuer: "aussie-gateway".to_string(),
            key_id: None,
            token_ttl_secs: 300,
            max_token_ttl_secs: 3600,
            forwarded_claims: vec!["sub".to_string(), "email".to_string()],
            default_audience: None,
            require_audience: false,
        }
    }

    async fn registry_with_active_key() -> Arc<SigningKeyRegistry> {
        let repo = Arc::new(InMemorySigningKeyRepository::new());
        let registry = Arc::new(SigningKeyRegistry::new(repo));
        let key_id = registry.generate_and_register(2048).await.unwrap();
        registry.activate(&key_id).await.unwrap();
        registry
    }

    fn valid_token(claims: HashMap<String, Value>) -> ValidatedToken {
        ValidatedToken::Valid {
            subject: "user-1".to_string(),
            issuer: "https://idp.example.com".to_string(),
            claims,
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn issues_token_with_effective_permissions_from_roles() {
        let registry = registry_with_active_key().await;
        let role_repo = Arc::new(InMemoryRoleOrGroupStore::new());
        let now = Utc::now();
        role_repo
            .store(RoleOrGroup {
                id: "devs".to_string(),
                display_name: "devs".to_string(),
                description: String::new(),
                permissions: HashSet::from(["apikeys.read".to_string()]),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let role_repo_dyn: Arc<dyn aussie_repository::RoleRepository> = role_repo;
        let roles = Arc::new(RoleService::new(role_repo_dyn, StdDuration::from_secs(60)));

        let issuer = TokenIssuer::new(
            registry,
            Some(roles),
            vec![Arc::new(JwsIssuerPlugin)],
            config(),
            "svc-a",
        );

        let mut claims = HashMap::new();
        claims.insert("roles".to_string(), serde_json::json!(["devs"]));
        claims.insert("email".to_string(), serde_json::json!("dev@example.com"));
        let validated = valid_token(claims);

        let token = issuer.issue(&validated, None, None).await.unwrap();
        assert!(token.is_some());
    }

    #[tokio::test]
    async fn non_valid_result_yields_no_token() {
        let registry = registry_with_active_key().await;
        let issuer = TokenIssuer::new(registry, None, vec![Arc::new(JwsIssuerPlugin)], config(), "svc-a");
        let result = issuer.issue(&ValidatedToken::NoToken, None, None).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn no_plugins_yields_no_token() {
        let registry = registry_with_active_key().await;
        let issuer = TokenIssuer::new(registry, None, vec![], config(), "svc-a");
        let result = issuer.issue(&valid_token(HashMap::new()), None, None).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn effective_audience_prefers_route_then_default_then_required_service_id() {
        let registry = registry_with_active_key().await;
        let mut cfg = config();
        cfg.require_audience = true;
        let issuer = TokenIssuer::new(registry, None, vec![Arc::new(JwsIssuerPlugin)], cfg, "svc-a");
        assert_eq!(
            issuer.effective_audience(Some("route-aud")),
            Some("route-aud".to_string())
        );
        assert_eq!(issuer.effective_audience(None), Some("svc-a".to_string()));
    }
}
