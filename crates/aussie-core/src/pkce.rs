//! PKCE challenge service (spec §4.8). Only S256 is supported; plain is
//! rejected outright. Verification atomically consumes the stored
//! challenge so it can never be replayed.

use std::sync::Arc;

use aussie_config::PkceConfig;
use aussie_crypto::hashing::{base64url_encode, random_bytes, sha256};
use aussie_repository::{PkceChallengeRecord, PkceChallengeRepository};
use chrono::{Duration, Utc};

use crate::error::{AuthError, AuthResult};

pub struct PkceService {
    repo: Arc<dyn PkceChallengeRepository>,
    config: PkceConfig,
}

impl PkceService {
    pub fn new(repo: Arc<dyn PkceChallengeRepository>, config: PkceConfig) -> Self {
        Self { repo, config }
    }

    pub fn generate_verifier(&self) -> String {
        base64url_encode(&random_bytes(64))
    }

    pub fn challenge(&self, verifier: &str) -> String {
        base64url_encode(&sha256(verifier.as_bytes()))
    }

    pub async fn store_challenge(&self, state: &str, challenge: &str) -> AuthResult<()> {
        if !self.config.enabled {
            return Err(AuthError::StateViolation("PKCE is disabled".to_string()));
        }
        if state.trim().is_empty() || challenge.trim().is_empty() {
            return Err(AuthError::ValidationFailure(
                "state and challenge must not be blank".to_string(),
            ));
        }
        self.repo
            .store(PkceChallengeRecord {
                state: state.to_string(),
                challenge: challenge.to_string(),
                expires_at: Utc::now() + Duration::seconds(self.config.challenge_ttl_secs as i64),
            })
            .await?;
        Ok(())
    }

    /// Never raises: absence, expiry, or mismatch all produce `false`.
    /// The challenge is consumed regardless of the outcome.
    pub async fn verify_challenge(&self, state: &str, verifier: &str) -> bool {
        let record = match self.repo.consume(state).await {
            Ok(Some(r)) => r,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, state, "pkce consume failed");
                return false;
            }
        };
        if record.expires_at < Utc::now() {
            return false;
        }
        self.challenge(verifier) == record.challenge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aussie_repository::memory::InMemoryPkceChallengeRepository;

    fn config() -> PkceConfig {
        PkceConfig {
            enabled: true,
            required: false,
            challenge_ttl_secs: 600,
            storage_provider: aussie_config::PkceStorageProvider::InMemory,
        }
    }

    fn service() -> PkceService {
        PkceService::new(Arc::new(InMemoryPkceChallengeRepository::new()), config())
    }

    #[tokio::test]
    async fn rfc7636_vector_stores_and_verifies() {
        let service = service();
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = service.challenge(verifier);
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");

        service.store_challenge("s", &challenge).await.unwrap();
        assert!(service.verify_challenge("s", verifier).await);
        assert!(!service.verify_challenge("s", verifier).await);
    }

    #[tokio::test]
    async fn mismatched_verifier_fails_without_raising() {
        let service = service();
        let challenge = service.challenge("correct-verifier");
        service.store_challenge("s", &challenge).await.unwrap();
        assert!(!service.verify_challenge("s", "wrong-verifier").await);
    }

    #[tokio::test]
    async fn unknown_state_returns_false() {
        let service = service();
        assert!(!service.verify_challenge("never-stored", "anything").await);
    }

    #[tokio::test]
    async fn blank_inputs_are_rejected() {
        let service = service();
        assert!(service.store_challenge("", "c").await.is_err());
        assert!(service.store_challenge("s", "").await.is_err());
    }

    #[tokio::test]
    async fn generated_verifier_round_trips() {
        let service = service();
        let verifier = service.generate_verifier();
        assert!(!verifier.contains('='));
        let challenge = service.challenge(&verifier);
        service.store_challenge("s2", &challenge).await.unwrap();
        assert!(service.verify_challenge("s2", &verifier).await);
    }
}
