//! Token validator (spec §4.4): iterates configured providers (sorted
//! by id, per the deterministic-ordering decision in DESIGN.md), and
//! for each, tries registered plugins sorted by descending priority.
//! The first `Valid` result wins, then is piped through the
//! revocation check.

pub mod plugin;

use std::sync::Arc;

use aussie_cache::JwksCache;
use aussie_config::{AuthConfig, TokenProviderConfig};

use crate::models::ValidatedToken;
use crate::revocation::RevocationService;
use plugin::ValidatorPlugin;

pub struct TokenValidator {
    providers: Vec<TokenProviderConfig>,
    plugins: Vec<Arc<dyn ValidatorPlugin>>,
    jwks: Arc<JwksCache>,
    revocation: Arc<RevocationService>,
    config: AuthConfig,
}

impl TokenValidator {
    pub fn new(
        mut providers: Vec<TokenProviderConfig>,
        mut plugins: Vec<Arc<dyn ValidatorPlugin>>,
        jwks: Arc<JwksCache>,
        revocation: Arc<RevocationService>,
        config: AuthConfig,
    ) -> Self {
        providers.sort_by(|a, b| a.id.cmp(&b.id));
        plugins.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Self {
            providers,
            plugins,
            jwks,
            revocation,
            config,
        }
    }

    pub async fn validate(&self, bearer: &str) -> ValidatedToken {
        if !self.config.enabled || bearer.is_empty() {
            return ValidatedToken::NoToken;
        }

        for provider in &self.providers {
            for plugin in &self.plugins {
                if !plugin.is_available(provider) {
                    continue;
                }
                let result = plugin.validate(bearer, provider, &self.jwks).await;
                if let ValidatedToken::Valid {
                    subject,
                    issuer,
                    claims,
                    expires_at,
                } = result
                {
                    return self
                        .apply_revocation_check(subject, issuer, claims, expires_at)
                        .await;
                }
            }
        }

        ValidatedToken::Invalid {
            reason: "not accepted by any provider".to_string(),
        }
    }

    async fn apply_revocation_check(
        &self,
        subject: String,
        issuer: String,
        claims: std::collections::HashMap<String, serde_json::Value>,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> ValidatedToken {
        let jti = claims.get("jti").and_then(|v| v.as_str());
        let iat = claims
            .get("iat")
            .and_then(|v| v.as_i64())
            .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
            .unwrap_or_else(chrono::Utc::now);

        let revoked = self
            .revocation
            .is_revoked(jti, Some(&subject), iat, expires_at)
            .await;

        if revoked {
            return ValidatedToken::Invalid {
                reason: "revoked".to_string(),
            };
        }

        ValidatedToken::Valid {
            subject,
            issuer,
            claims,
            expires_at,
        }
    }
}
