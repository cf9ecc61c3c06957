//! Repository interfaces and persisted data model for the Aussie auth
//! core (spec §6). This crate defines contracts only; concrete
//! production backends (Postgres, Redis, ...) are out of scope and
//! live outside this workspace. The `memory` module's implementations
//! back this crate's tests and `aussie-core`'s integration tests.

pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;

pub use error::{RepositoryError, RepositoryResult};
pub use models::*;
pub use repositories::{
    ApiKeyRepository, FailedAttemptRepository, GroupRepository, PkceChallengeRepository,
    RevocationEventPublisher, RoleRepository, SigningKeyRepository, TokenRevocationRepository,
    TranslationConfigRepository,
};
