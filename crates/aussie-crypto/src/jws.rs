//! Thin wrapper around `jsonwebtoken` for RS256 sign/verify, plus
//! conversion of a JWK entry into a `DecodingKey` for JWKS-backed
//! verification.

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JwsError {
    #[error("signing failed: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("verification failed: {0}")]
    Verify(#[source] jsonwebtoken::errors::Error),
    #[error("unsupported JWK algorithm")]
    UnsupportedJwk,
}

/// Signs `claims` with the given key, embedding `kid` in the header so
/// verifiers can resolve the right key out of a JWKS.
pub fn sign<T: Serialize>(claims: &T, key: &EncodingKey, kid: &str) -> Result<String, JwsError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, key).map_err(JwsError::Sign)
}

/// Verifies a token against a resolved decoding key. `aud`/`iss` checks
/// are the caller's responsibility via `validation`, since they depend
/// on per-provider configuration.
pub fn verify<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<TokenData<T>, JwsError> {
    decode::<T>(token, key, validation).map_err(JwsError::Verify)
}

/// Converts an RSA JWK entry into a `DecodingKey`.
pub fn decoding_key_from_jwk(jwk: &Jwk) -> Result<DecodingKey, JwsError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            DecodingKey::from_rsa_components(&rsa.n, &rsa.e).map_err(JwsError::Verify)
        }
        _ => Err(JwsError::UnsupportedJwk),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyMaterial;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Claims {
        sub: String,
        exp: i64,
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let material = KeyMaterial::generate(2048).unwrap();
        let claims = Claims {
            sub: "user-1".to_string(),
            exp: chrono::Utc::now().timestamp() + 300,
        };
        let token = sign(&claims, &material.encoding_key().unwrap(), "k-2026-q3-abcd1234").unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims::<&str>(&[]);
        validation.validate_aud = false;
        let decoded: TokenData<Claims> =
            verify(&token, &material.decoding_key().unwrap(), &validation).unwrap();
        assert_eq!(decoded.claims, claims);
    }
}
