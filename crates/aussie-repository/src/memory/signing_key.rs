use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{KeyStatus, SigningKeyRecord};
use crate::repositories::SigningKeyRepository;

/// In-memory signing key store. `active_id` is tracked separately so
/// `find_active` doesn't need to scan on every call.
#[derive(Default)]
pub struct InMemorySigningKeyRepository {
    keys: DashMap<String, SigningKeyRecord>,
    active_id: RwLock<Option<String>>,
}

impl InMemorySigningKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SigningKeyRepository for InMemorySigningKeyRepository {
    async fn store(&self, key: SigningKeyRecord) -> RepositoryResult<()> {
        if key.status == KeyStatus::Active {
            *self.active_id.write().unwrap() = Some(key.key_id.clone());
        }
        self.keys.insert(key.key_id.clone(), key);
        Ok(())
    }

    async fn find_active(&self) -> RepositoryResult<Option<SigningKeyRecord>> {
        let id = self.active_id.read().unwrap().clone();
        Ok(match id {
            Some(id) => self.keys.get(&id).map(|r| r.clone()),
            None => None,
        })
    }

    async fn find_by_id(&self, key_id: &str) -> RepositoryResult<Option<SigningKeyRecord>> {
        Ok(self.keys.get(key_id).map(|r| r.clone()))
    }

    async fn find_by_status(&self, status: KeyStatus) -> RepositoryResult<Vec<SigningKeyRecord>> {
        Ok(self
            .keys
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.clone())
            .collect())
    }

    async fn find_all(&self) -> RepositoryResult<Vec<SigningKeyRecord>> {
        Ok(self.keys.iter().map(|r| r.clone()).collect())
    }

    async fn find_all_for_verification(&self) -> RepositoryResult<Vec<SigningKeyRecord>> {
        Ok(self
            .keys
            .iter()
            .filter(|r| matches!(r.status, KeyStatus::Active | KeyStatus::Deprecated))
            .map(|r| r.clone())
            .collect())
    }

    async fn update_status(
        &self,
        key_id: &str,
        status: KeyStatus,
        at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let mut record = self
            .keys
            .get_mut(key_id)
            .ok_or_else(|| RepositoryError::NotFound(key_id.to_string()))?;
        record.status = status;
        match status {
            KeyStatus::Active => {
                record.activated_at = Some(at);
                *self.active_id.write().unwrap() = Some(key_id.to_string());
            }
            KeyStatus::Deprecated => record.deprecated_at = Some(at),
            KeyStatus::Retired => record.retired_at = Some(at),
            KeyStatus::Pending => {}
        }
        Ok(())
    }

    async fn delete(&self, key_id: &str) -> RepositoryResult<()> {
        self.keys.remove(key_id);
        let mut active = self.active_id.write().unwrap();
        if active.as_deref() == Some(key_id) {
            *active = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(key_id: &str, status: KeyStatus) -> SigningKeyRecord {
        SigningKeyRecord {
            key_id: key_id.to_string(),
            private_key_pem: "priv".to_string(),
            public_key_pem: "pub".to_string(),
            status,
            created_at: Utc::now(),
            activated_at: None,
            deprecated_at: None,
            retired_at: None,
        }
    }

    #[tokio::test]
    async fn store_and_find_active() {
        let repo = InMemorySigningKeyRepository::new();
        repo.store(sample("k-1", KeyStatus::Active)).await.unwrap();
        let active = repo.find_active().await.unwrap().unwrap();
        assert_eq!(active.key_id, "k-1");
    }

    #[tokio::test]
    async fn transition_updates_active_pointer() {
        let repo = InMemorySigningKeyRepository::new();
        repo.store(sample("k-1", KeyStatus::Active)).await.unwrap();
        repo.store(sample("k-2", KeyStatus::Pending)).await.unwrap();
        repo.update_status("k-1", KeyStatus::Deprecated, Utc::now())
            .await
            .unwrap();
        repo.update_status("k-2", KeyStatus::Active, Utc::now())
            .await
            .unwrap();
        let active = repo.find_active().await.unwrap().unwrap();
        assert_eq!(active.key_id, "k-2");
        let verification = repo.find_all_for_verification().await.unwrap();
        assert_eq!(verification.len(), 2);
    }
}
