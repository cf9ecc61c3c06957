//! `aussie` — authentication and authorization core for the Aussie API
//! gateway. This crate is a thin facade over the workspace members,
//! mirroring the teacher's root `prelude` pattern: a host process (the
//! HTTP listener, request router, and proxy forwarder named in scope
//! §1 as out of scope here) depends on this one crate instead of
//! reaching into each member directly.
//!
//! Data flow (spec §2):
//! `bearer -> TokenValidator (-> JwksCache) -> RevocationService ->
//! ClaimsTranslationService -> RoleService/GroupService ->
//! AuthorizationEvaluator -> TokenIssuer -> forwarded token`

pub use aussie_cache as cache;
pub use aussie_config as config;
pub use aussie_core as core;
pub use aussie_crypto as crypto;
pub use aussie_repository as repository;

pub use aussie_core::{
    ActiveSigningKey, ApiKeyService, AuthError, AuthRateLimiter, AuthResult, AuthorizationEvaluator,
    ClaimsTranslationService, CreatedApiKey, FailedAttemptOutcome, GroupService, IssuerPlugin,
    JwsIssuerPlugin, KeyRotationService, LockoutCheck, PkceService, PolicyDecision,
    RevocationService, RoleService, ServicePolicy, SigningKeyRegistry, TokenIssuer, TokenValidator,
    TranslatedClaims, ValidatedToken, ValidatorPlugin,
};
