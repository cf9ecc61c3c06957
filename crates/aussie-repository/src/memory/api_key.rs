use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{RepositoryError, RepositoryResult};
use crate::models::ApiKeyRecord;
use crate::repositories::ApiKeyRepository;

#[derive(Default)]
pub struct InMemoryApiKeyRepository {
    keys: DashMap<String, ApiKeyRecord>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn store(&self, record: ApiKeyRecord) -> RepositoryResult<()> {
        self.keys.insert(record.key_id.clone(), record);
        Ok(())
    }

    async fn find_by_id(&self, key_id: &str) -> RepositoryResult<Option<ApiKeyRecord>> {
        Ok(self.keys.get(key_id).map(|r| r.clone()))
    }

    async fn find_all(&self) -> RepositoryResult<Vec<ApiKeyRecord>> {
        Ok(self.keys.iter().map(|r| r.clone()).collect())
    }

    async fn revoke(&self, key_id: &str) -> RepositoryResult<()> {
        let mut record = self
            .keys
            .get_mut(key_id)
            .ok_or_else(|| RepositoryError::NotFound(key_id.to_string()))?;
        record.revoked = true;
        Ok(())
    }

    async fn count(&self) -> RepositoryResult<usize> {
        Ok(self.keys.len())
    }
}
