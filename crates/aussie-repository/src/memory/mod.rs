//! In-memory repository implementations. These exist for this crate's
//! own tests and for `aussie-core`'s integration tests -- not as a
//! production backend (persistence backends are out of scope).

mod api_key;
mod failed_attempt;
mod pkce;
mod revocation;
mod role_group;
mod signing_key;
mod translation;

pub use api_key::InMemoryApiKeyRepository;
pub use failed_attempt::InMemoryFailedAttemptRepository;
pub use pkce::InMemoryPkceChallengeRepository;
pub use revocation::InMemoryRevocationRepository;
pub use role_group::InMemoryRoleOrGroupStore;
pub use signing_key::InMemorySigningKeyRepository;
pub use translation::InMemoryTranslationConfigRepository;
