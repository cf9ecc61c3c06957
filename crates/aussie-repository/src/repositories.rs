//! Repository trait definitions (spec §6 "External Interfaces").
//!
//! These are the only persistence-facing contracts this crate defines;
//! concrete backends (Postgres, Redis, etc.) are out of scope per the
//! spec and live outside this workspace. The `memory` module ships one
//! in-memory implementation of each trait, used by this crate's own
//! tests and by `aussie-core`'s integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::RepositoryResult;
use crate::models::{
    ApiKeyRecord, FailedAttemptRecord, LockoutRecord, PkceChallengeRecord, RevocationEvent,
    RoleOrGroup, SigningKeyRecord, TranslationConfigRecord,
};

#[async_trait]
pub trait SigningKeyRepository: Send + Sync {
    async fn store(&self, key: SigningKeyRecord) -> RepositoryResult<()>;
    async fn find_active(&self) -> RepositoryResult<Option<SigningKeyRecord>>;
    async fn find_by_id(&self, key_id: &str) -> RepositoryResult<Option<SigningKeyRecord>>;
    async fn find_by_status(
        &self,
        status: crate::models::KeyStatus,
    ) -> RepositoryResult<Vec<SigningKeyRecord>>;
    async fn find_all(&self) -> RepositoryResult<Vec<SigningKeyRecord>>;
    /// All keys eligible to verify a token signature: ACTIVE + DEPRECATED.
    async fn find_all_for_verification(&self) -> RepositoryResult<Vec<SigningKeyRecord>>;
    async fn update_status(
        &self,
        key_id: &str,
        status: crate::models::KeyStatus,
        at: DateTime<Utc>,
    ) -> RepositoryResult<()>;
    async fn delete(&self, key_id: &str) -> RepositoryResult<()>;
}

#[async_trait]
pub trait TokenRevocationRepository: Send + Sync {
    async fn is_revoked(&self, jti: &str) -> RepositoryResult<bool>;
    async fn is_user_revoked(
        &self,
        user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> RepositoryResult<bool>;
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> RepositoryResult<()>;
    async fn revoke_all_for_user(
        &self,
        user_id: &str,
        issued_before: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<()>;
    /// Full snapshot of currently-revoked JTIs, for bloom filter rebuild.
    async fn all_revoked_jtis(&self) -> RepositoryResult<Vec<(String, DateTime<Utc>)>>;
    /// Full snapshot of user-wide revocations, for bloom filter rebuild.
    async fn all_revoked_users(
        &self,
    ) -> RepositoryResult<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>;
}

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn store(&self, record: ApiKeyRecord) -> RepositoryResult<()>;
    async fn find_by_id(&self, key_id: &str) -> RepositoryResult<Option<ApiKeyRecord>>;
    async fn find_all(&self) -> RepositoryResult<Vec<ApiKeyRecord>>;
    async fn revoke(&self, key_id: &str) -> RepositoryResult<()>;
    async fn count(&self) -> RepositoryResult<usize>;
}

#[async_trait]
pub trait FailedAttemptRepository: Send + Sync {
    async fn get_attempt(&self, key: &str) -> RepositoryResult<Option<FailedAttemptRecord>>;
    /// Increments the failure counter for `key`, starting a fresh window
    /// (count reset to 1) if `now` has moved past the prior window's
    /// `windowStart` by at least `window`.
    async fn record_failure(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: chrono::Duration,
    ) -> RepositoryResult<FailedAttemptRecord>;
    async fn clear(&self, key: &str) -> RepositoryResult<()>;

    async fn get_lockout(&self, key: &str) -> RepositoryResult<Option<LockoutRecord>>;
    async fn set_lockout(&self, record: LockoutRecord) -> RepositoryResult<()>;
    async fn clear_lockout(&self, key: &str) -> RepositoryResult<()>;
}

#[async_trait]
pub trait PkceChallengeRepository: Send + Sync {
    async fn store(&self, record: PkceChallengeRecord) -> RepositoryResult<()>;
    /// Atomically fetch-and-delete: a challenge may be consumed exactly
    /// once (spec §4.8).
    async fn consume(&self, state: &str) -> RepositoryResult<Option<PkceChallengeRecord>>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<RoleOrGroup>>;
    async fn find_all(&self) -> RepositoryResult<Vec<RoleOrGroup>>;
    async fn store(&self, role: RoleOrGroup) -> RepositoryResult<()>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<RoleOrGroup>>;
    async fn find_all(&self) -> RepositoryResult<Vec<RoleOrGroup>>;
    async fn store(&self, group: RoleOrGroup) -> RepositoryResult<()>;
}

#[async_trait]
pub trait TranslationConfigRepository: Send + Sync {
    /// Providers sorted by id, per the deterministic-ordering decision
    /// recorded in DESIGN.md.
    async fn find_all_enabled(&self) -> RepositoryResult<Vec<TranslationConfigRecord>>;
}

/// Cross-instance fan-out for revocation events (spec §6). A single
/// process both publishes (on its own revoke calls) and subscribes (to
/// invalidate its local bloom/LRU caches when another instance revokes).
#[async_trait]
pub trait RevocationEventPublisher: Send + Sync {
    async fn publish(&self, event: RevocationEvent) -> RepositoryResult<()>;

    /// A live stream of events published by any instance, including
    /// this one's own publishes in some implementations -- subscribers
    /// must tolerate redundant delivery of events they already applied.
    fn subscribe(&self) -> BoxStream<'static, RevocationEvent>;
}
