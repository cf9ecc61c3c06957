//! Error taxonomy for the auth core (spec §7). Hot-path operations
//! return explicit sum-type results instead of raising; this enum
//! covers the cases that do need to cross a `Result` boundary
//! (construction-time failures, repository faults surfaced to a
//! caller that must react to them).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("authentication invalid: {0}")]
    AuthInvalid(String),

    #[error("caller locked out, retry after {retry_after_secs}s")]
    AuthLocked { retry_after_secs: i64 },

    #[error("JWKS fetch failed: {0}")]
    JwksFetchError(#[from] aussie_cache::CacheError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("state violation: {0}")]
    StateViolation(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("token signing failed: {0}")]
    SigningFailure(#[from] aussie_crypto::jws::JwsError),
}

impl From<aussie_repository::RepositoryError> for AuthError {
    fn from(err: aussie_repository::RepositoryError) -> Self {
        match err {
            aussie_repository::RepositoryError::NotFound(m) => AuthError::NotFound(m),
            aussie_repository::RepositoryError::Transient(m) => AuthError::Transient(m),
            aussie_repository::RepositoryError::Validation(m) => AuthError::ValidationFailure(m),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
