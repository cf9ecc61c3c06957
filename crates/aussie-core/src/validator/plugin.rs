//! Validator plugin contract (spec §4.4, §9 "explicit registration").
//! A plugin encapsulates signature verification plus `exp`/`nbf`/`iss`/
//! `aud` checks for one provider; the registry chooses by name first,
//! else highest priority among plugins that claim availability.

use std::collections::HashMap;

use async_trait::async_trait;
use aussie_cache::JwksCache;
use aussie_config::TokenProviderConfig;

use crate::models::ValidatedToken;

#[async_trait]
pub trait ValidatorPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn priority(&self) -> i32;
    fn is_available(&self, provider: &TokenProviderConfig) -> bool;
    async fn validate(
        &self,
        token: &str,
        provider: &TokenProviderConfig,
        jwks: &JwksCache,
    ) -> ValidatedToken;
}

/// Standard RS256-via-JWKS plugin: resolves the signing key by `kid`,
/// verifies the signature, and checks `exp`/`iss`/`aud` against the
/// provider's config.
pub struct JwksRs256Validator;

#[async_trait]
impl ValidatorPlugin for JwksRs256Validator {
    fn name(&self) -> &str {
        "jwks-rs256"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn is_available(&self, provider: &TokenProviderConfig) -> bool {
        !provider.jwks_uri.is_empty()
    }

    async fn validate(
        &self,
        token: &str,
        provider: &TokenProviderConfig,
        jwks: &JwksCache,
    ) -> ValidatedToken {
        let header = match jsonwebtoken::decode_header(token) {
            Ok(h) => h,
            Err(_) => {
                return ValidatedToken::Invalid {
                    reason: "malformed token header".to_string(),
                }
            }
        };

        let jwk = match jwks.get_key(&provider.jwks_uri, header.kid.as_deref()).await {
            Some(jwk) => jwk,
            None => {
                return ValidatedToken::Invalid {
                    reason: "no matching signing key in JWKS".to_string(),
                }
            }
        };

        let decoding_key = match aussie_crypto::jws::decoding_key_from_jwk(&jwk) {
            Ok(k) => k,
            Err(_) => {
                return ValidatedToken::Invalid {
                    reason: "unsupported JWKS key type".to_string(),
                }
            }
        };

        let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.set_issuer(&[&provider.issuer]);
        if !provider.audiences.is_empty() {
            validation.set_audience(&provider.audiences.iter().collect::<Vec<_>>());
        } else {
            validation.validate_aud = false;
        }

        let decoded = match jsonwebtoken::decode::<HashMap<String, serde_json::Value>>(
            token,
            &decoding_key,
            &validation,
        ) {
            Ok(d) => d,
            Err(e) => {
                return ValidatedToken::Invalid {
                    reason: format!("signature/claims check failed: {e}"),
                }
            }
        };

        let claims = decoded.claims;
        let subject = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let expires_at = claims
            .get("exp")
            .and_then(|v| v.as_i64())
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(chrono::Utc::now);

        ValidatedToken::Valid {
            subject,
            issuer: provider.issuer.clone(),
            claims,
            expires_at,
        }
    }
}
