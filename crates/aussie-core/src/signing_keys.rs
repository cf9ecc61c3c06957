//! Signing key registry (spec §4.2). Publishes a single immutable
//! snapshot on each mutation so readers never observe a torn state --
//! the same `ArcSwap`-a-whole-value pattern as `aussie-cache`'s bloom
//! filter, applied here to the verification key set instead.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use aussie_crypto::keys::{generate_key_id, KeyMaterial};
use aussie_repository::{KeyStatus, SigningKeyRecord, SigningKeyRepository};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::error::{AuthError, AuthResult};

#[derive(Clone)]
pub struct ActiveSigningKey {
    pub key_id: String,
    pub encoding_key: Arc<EncodingKey>,
}

struct Snapshot {
    active: Option<ActiveSigningKey>,
    verification_map: HashMap<String, Arc<DecodingKey>>,
    verification_list: Vec<String>,
    last_refresh: chrono::DateTime<Utc>,
    initialized: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            active: None,
            verification_map: HashMap::new(),
            verification_list: Vec::new(),
            last_refresh: Utc::now(),
            initialized: false,
        }
    }
}

pub struct SigningKeyRegistry {
    repo: Arc<dyn SigningKeyRepository>,
    snapshot: ArcSwap<Snapshot>,
}

impl SigningKeyRegistry {
    pub fn new(repo: Arc<dyn SigningKeyRepository>) -> Self {
        Self {
            repo,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    pub fn current_signing(&self) -> AuthResult<ActiveSigningKey> {
        self.snapshot
            .load()
            .active
            .clone()
            .ok_or_else(|| AuthError::StateViolation("no active signing key".to_string()))
    }

    pub fn verification(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        self.snapshot.load().verification_map.get(kid).cloned()
    }

    pub fn all_verification_kids(&self) -> Vec<String> {
        self.snapshot.load().verification_list.clone()
    }

    pub async fn register(&self, private_pem: String, public_pem: String) -> AuthResult<String> {
        let key_id = generate_key_id();
        self.repo
            .store(SigningKeyRecord {
                key_id: key_id.clone(),
                private_key_pem: private_pem,
                public_key_pem: public_pem,
                status: KeyStatus::Pending,
                created_at: Utc::now(),
                activated_at: None,
                deprecated_at: None,
                retired_at: None,
            })
            .await?;
        Ok(key_id)
    }

    pub async fn generate_and_register(&self, bits: usize) -> AuthResult<String> {
        let material = KeyMaterial::generate(bits)
            .map_err(|e| AuthError::Transient(format!("key generation failed: {e}")))?;
        self.register(material.private_pem, material.public_pem).await
    }

    /// If an ACTIVE key exists, it is deprecated first, then `new_key_id`
    /// becomes ACTIVE. Both steps persist before the cache is refreshed
    /// (spec §5 ordering guarantee).
    pub async fn activate(&self, new_key_id: &str) -> AuthResult<()> {
        if let Some(current) = self.repo.find_active().await? {
            if current.key_id != new_key_id {
                self.repo
                    .update_status(&current.key_id, KeyStatus::Deprecated, Utc::now())
                    .await?;
            }
        }
        self.repo
            .update_status(new_key_id, KeyStatus::Active, Utc::now())
            .await?;
        self.refresh_cache().await
    }

    pub async fn deprecate(&self, key_id: &str) -> AuthResult<()> {
        self.repo
            .update_status(key_id, KeyStatus::Deprecated, Utc::now())
            .await?;
        self.refresh_cache().await
    }

    pub async fn retire(&self, key_id: &str) -> AuthResult<()> {
        self.repo
            .update_status(key_id, KeyStatus::Retired, Utc::now())
            .await?;
        self.refresh_cache().await
    }

    pub async fn delete(&self, key_id: &str) -> AuthResult<()> {
        self.repo.delete(key_id).await?;
        self.refresh_cache().await
    }

    pub async fn all(&self) -> AuthResult<Vec<SigningKeyRecord>> {
        Ok(self.repo.find_all_for_verification().await?)
    }

    /// Direct repository pass-through for lifecycle steps that need
    /// PENDING/RETIRED keys, which the cached snapshot doesn't track.
    pub async fn repo_find_by_status(&self, status: KeyStatus) -> AuthResult<Vec<SigningKeyRecord>> {
        Ok(self.repo.find_by_status(status).await?)
    }

    /// Rebuilds and atomically publishes a fresh snapshot from the
    /// repository's current state.
    pub async fn refresh_cache(&self) -> AuthResult<()> {
        let verification_records = self.repo.find_all_for_verification().await?;
        let active_record = self.repo.find_active().await?;

        let mut verification_map = HashMap::new();
        let mut verification_list = Vec::new();
        for record in &verification_records {
            let decoding = KeyMaterial {
                private_pem: record.private_key_pem.clone(),
                public_pem: record.public_key_pem.clone(),
            }
            .decoding_key()
            .map_err(|e| AuthError::Transient(format!("decoding key material: {e}")))?;
            verification_map.insert(record.key_id.clone(), Arc::new(decoding));
            verification_list.push(record.key_id.clone());
        }

        let active = match active_record {
            Some(record) => {
                let encoding = KeyMaterial {
                    private_pem: record.private_key_pem.clone(),
                    public_pem: record.public_key_pem.clone(),
                }
                .encoding_key()
                .map_err(|e| AuthError::Transient(format!("encoding key material: {e}")))?;
                Some(ActiveSigningKey {
                    key_id: record.key_id,
                    encoding_key: Arc::new(encoding),
                })
            }
            None => None,
        };

        self.snapshot.store(Arc::new(Snapshot {
            active,
            verification_map,
            verification_list,
            last_refresh: Utc::now(),
            initialized: true,
        }));
        Ok(())
    }

    pub fn initialized(&self) -> bool {
        self.snapshot.load().initialized
    }
}
