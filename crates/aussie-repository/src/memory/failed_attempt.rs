use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::error::RepositoryResult;
use crate::models::{FailedAttemptRecord, LockoutRecord};
use crate::repositories::FailedAttemptRepository;

#[derive(Default)]
pub struct InMemoryFailedAttemptRepository {
    attempts: DashMap<String, FailedAttemptRecord>,
    lockouts: DashMap<String, LockoutRecord>,
}

impl InMemoryFailedAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FailedAttemptRepository for InMemoryFailedAttemptRepository {
    async fn get_attempt(&self, key: &str) -> RepositoryResult<Option<FailedAttemptRecord>> {
        Ok(self.attempts.get(key).map(|r| r.clone()))
    }

    async fn record_failure(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> RepositoryResult<FailedAttemptRecord> {
        let mut entry = self
            .attempts
            .entry(key.to_string())
            .or_insert_with(|| FailedAttemptRecord {
                key: key.to_string(),
                count: 0,
                window_start: now,
            });
        if now - entry.window_start >= window {
            entry.count = 1;
            entry.window_start = now;
        } else {
            entry.count += 1;
        }
        Ok(entry.clone())
    }

    async fn clear(&self, key: &str) -> RepositoryResult<()> {
        self.attempts.remove(key);
        Ok(())
    }

    async fn get_lockout(&self, key: &str) -> RepositoryResult<Option<LockoutRecord>> {
        Ok(self.lockouts.get(key).map(|r| r.clone()))
    }

    async fn set_lockout(&self, record: LockoutRecord) -> RepositoryResult<()> {
        self.lockouts.insert(record.key.clone(), record);
        Ok(())
    }

    async fn clear_lockout(&self, key: &str) -> RepositoryResult<()> {
        self.lockouts.remove(key);
        Ok(())
    }
}
