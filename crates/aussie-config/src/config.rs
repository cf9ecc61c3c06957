//! Typed configuration structures for every flag group the auth core
//! recognizes (spec §6). Loading these from files/env is a host
//! concern; this crate only defines the validated shape.

use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    pub enabled: bool,
    /// Disables all auth checks. Refused at startup when `production` is true.
    pub dangerous_noop: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dangerous_noop: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    pub enabled: bool,
    #[validate(range(min = 1))]
    pub max_failed_attempts: u32,
    pub failed_attempt_window_secs: u64,
    pub lockout_duration_secs: u64,
    pub max_lockout_duration_secs: u64,
    pub progressive_lockout_multiplier: f64,
    pub track_by_ip: bool,
    pub track_by_identifier: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
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
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BloomFilterConfig {
    pub enabled: bool,
    #[validate(range(min = 1))]
    pub expected_insertions: usize,
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub false_positive_probability: f64,
    pub rebuild_interval_secs: u64,
}

impl Default for BloomFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expected_insertions: 100_000,
            false_positive_probability: 0.001,
            rebuild_interval_secs: 3_600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RevocationCacheConfig {
    pub enabled: bool,
    #[validate(range(min = 1))]
    pub max_size: u64,
    pub ttl_secs: u64,
}

impl Default for RevocationCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 50_000,
            ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RevocationConfig {
    pub enabled: bool,
    /// Tokens expiring within this many seconds are never checked (tier 0 shortcut).
    pub check_threshold_secs: i64,
    pub check_user_revocation: bool,
    #[validate(nested)]
    pub bloom_filter: BloomFilterConfig,
    #[validate(nested)]
    pub cache: RevocationCacheConfig,
    pub pubsub_enabled: bool,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_threshold_secs: 5,
            check_user_revocation: true,
            bloom_filter: BloomFilterConfig::default(),
            cache: RevocationCacheConfig::default(),
            pubsub_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KeyRotationConfig {
    pub enabled: bool,
    #[validate(range(min = 2048))]
    pub key_size: u32,
    pub grace_period_secs: i64,
    pub deprecation_period_secs: i64,
    pub retention_period_secs: i64,
    pub cache_refresh_interval_secs: u64,
}

impl Default for KeyRotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_size: 2048,
            grace_period_secs: 3_600,
            deprecation_period_secs: 7 * 86_400,
            retention_period_secs: 30 * 86_400,
            cache_refresh_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JwksConfig {
    #[validate(range(min = 1))]
    pub max_cache_entries: u64,
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for JwksConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 64,
            cache_ttl_secs: 3_600,
            fetch_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PkceStorageProvider {
    InMemory,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PkceConfig {
    pub enabled: bool,
    pub required: bool,
    pub challenge_ttl_secs: u64,
    pub storage_provider: PkceStorageProvider,
}

impl Default for PkceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            required: false,
            challenge_ttl_secs: 600,
            storage_provider: PkceStorageProvider::InMemory,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssuanceConfig {
    #[validate(length(min = 1))]
    pub issuer: String,
    /// References the active signing key at issuance time; not pinned in config.
    pub key_id: Option<String>,
    pub token_ttl_secs: i64,
    pub max_token_ttl_secs: i64,
    pub forwarded_claims: Vec<String>,
    pub default_audience: Option<String>,
    pub require_audience: bool,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            issuer: "aussie-gateway".to_string(),
            key_id: None,
            token_ttl_secs: 300,
            max_token_ttl_secs: 3_600,
            forwarded_claims: vec!["sub".to_string(), "email".to_string()],
            default_audience: None,
            require_audience: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub enabled: bool,
    pub recovery_mode: bool,
    /// Operator-supplied plaintext admin key. Never auto-generated.
    pub key: Option<Secret<String>>,
    pub ttl_secs: Option<i64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            recovery_mode: false,
            key: None,
            ttl_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Base64-encoded 256-bit AES key. `None` disables at-rest encryption.
    pub key_base64: Option<Secret<String>>,
    pub key_id: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key_base64: None,
            key_id: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TranslationCacheConfig {
    pub ttl_secs: u64,
    #[validate(range(min = 1))]
    pub max_size: u64,
}

impl Default for TranslationCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub provider: Option<String>,
    #[validate(nested)]
    pub cache: TranslationCacheConfig,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: None,
            cache: TranslationCacheConfig::default(),
        }
    }
}

/// Immutable-after-load token provider config (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TokenProviderConfig {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub issuer: String,
    #[validate(length(min = 1))]
    pub jwks_uri: String,
    pub discovery_uri: Option<String>,
    pub audiences: HashSet<String>,
    pub key_refresh_interval_secs: u64,
    pub claims_mapping: HashMap<String, String>,
}

/// Top-level configuration aggregating every flag group.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AussieConfig {
    /// Whether this process is running in production (gates `auth.dangerous_noop`).
    pub production: bool,
    #[validate(nested)]
    pub auth: AuthConfig,
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,
    #[validate(nested)]
    pub revocation: RevocationConfig,
    #[validate(nested)]
    pub key_rotation: KeyRotationConfig,
    #[validate(nested)]
    pub jwks: JwksConfig,
    #[validate(nested)]
    pub pkce: PkceConfig,
    #[validate(nested)]
    pub issuance: IssuanceConfig,
    pub bootstrap: BootstrapConfig,
    pub encryption: EncryptionConfig,
    #[validate(nested)]
    pub translation: TranslationConfig,
    #[validate(nested)]
    pub providers: Vec<TokenProviderConfig>,
}

impl Default for AussieConfig {
    fn default() -> Self {
        Self {
            production: false,
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            revocation: RevocationConfig::default(),
            key_rotation: KeyRotationConfig::default(),
            jwks: JwksConfig::default(),
            pkce: PkceConfig::default(),
            issuance: IssuanceConfig::default(),
            bootstrap: BootstrapConfig::default(),
            encryption: EncryptionConfig::default(),
            translation: TranslationConfig::default(),
            providers: Vec::new(),
        }
    }
}
