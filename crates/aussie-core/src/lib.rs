//! Authentication and authorization core services for the Aussie
//! gateway (spec §4). Each module is one coherent service; together
//! they implement the data flow spec §2 describes:
//!
//! `bearer -> TokenValidator (-> JwksCache) -> RevocationService ->
//! ClaimsTranslationService -> RoleService/GroupService ->
//! AuthorizationEvaluator -> TokenIssuer -> forwarded token`
//!
//! with `AuthRateLimiter` tracking failed attempts alongside.

pub mod api_keys;
pub mod authorization;
pub mod error;
pub mod issuance;
pub mod key_rotation;
pub mod models;
pub mod pkce;
pub mod rate_limit;
pub mod revocation;
pub mod roles;
pub mod signing_keys;
pub mod validator;

pub use api_keys::{ApiKeyService, CreatedApiKey};
pub use authorization::{AuthorizationEvaluator, PolicyDecision};
pub use error::{AuthError, AuthResult};
pub use issuance::{IssuerPlugin, JwsIssuerPlugin, TokenIssuer};
pub use key_rotation::KeyRotationService;
pub use models::{FailedAttemptOutcome, LockoutCheck, OperationPermission, ServicePolicy, TranslatedClaims, ValidatedToken};
pub use pkce::PkceService;
pub use rate_limit::AuthRateLimiter;
pub use revocation::RevocationService;
pub use roles::{ClaimsTranslationProvider, ClaimsTranslationService, GroupService, PassthroughClaimsProvider, RoleService};
pub use signing_keys::{ActiveSigningKey, SigningKeyRegistry};
pub use validator::{
    plugin::{JwksRs256Validator, ValidatorPlugin},
    TokenValidator,
};
