use thiserror::Error;

/// Errors surfaced by repository implementations. Deliberately coarse:
/// callers in `aussie-core` branch on these three cases, never on a
/// specific backend's error type (spec §1: persistence is out of scope,
/// only the interface is defined).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient repository failure: {0}")]
    Transient(String),

    #[error("invalid record: {0}")]
    Validation(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
