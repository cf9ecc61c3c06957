use std::sync::Mutex;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::RepositoryResult;
use crate::models::PkceChallengeRecord;
use crate::repositories::PkceChallengeRepository;

/// Plain `Mutex<HashMap<..>>` rather than `DashMap` -- `consume` needs
/// to be a single fetch-and-delete rather than two racy operations.
#[derive(Default)]
pub struct InMemoryPkceChallengeRepository {
    challenges: Mutex<HashMap<String, PkceChallengeRecord>>,
}

impl InMemoryPkceChallengeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PkceChallengeRepository for InMemoryPkceChallengeRepository {
    async fn store(&self, record: PkceChallengeRecord) -> RepositoryResult<()> {
        self.challenges
            .lock()
            .unwrap()
            .insert(record.state.clone(), record);
        Ok(())
    }

    async fn consume(&self, state: &str) -> RepositoryResult<Option<PkceChallengeRecord>> {
        Ok(self.challenges.lock().unwrap().remove(state))
    }
}
