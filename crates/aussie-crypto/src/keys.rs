//! RSA keypair generation for the internal JWS signing key registry,
//! and the `k-<year>-q<quarter>-<8-hex>` key id format (spec §4.2).

use chrono::{Datelike, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::RngCore;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::LineEnding;
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key generation failed: {0}")]
    Generation(String),
    #[error("key encoding failed: {0}")]
    Encoding(String),
}

/// A generated RSA keypair in PEM form, ready to hand to `jsonwebtoken`.
#[derive(Clone)]
pub struct KeyMaterial {
    pub private_pem: String,
    pub public_pem: String,
}

impl KeyMaterial {
    pub fn generate(bits: usize) -> Result<Self, KeyError> {
        let mut rng = rand::rngs::OsRng;
        let private_key =
            RsaPrivateKey::new(&mut rng, bits).map_err(|e| KeyError::Generation(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| KeyError::Encoding(e.to_string()))?
            .to_string();
        let public_pem = public_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| KeyError::Encoding(e.to_string()))?;

        Ok(Self {
            private_pem,
            public_pem,
        })
    }

    pub fn encoding_key(&self) -> Result<EncodingKey, KeyError> {
        EncodingKey::from_rsa_pem(self.private_pem.as_bytes())
            .map_err(|e| KeyError::Encoding(e.to_string()))
    }

    pub fn decoding_key(&self) -> Result<DecodingKey, KeyError> {
        DecodingKey::from_rsa_pem(self.public_pem.as_bytes())
            .map_err(|e| KeyError::Encoding(e.to_string()))
    }

    /// Re-derive the public PEM from a stored private PEM, for repositories
    /// that only persist the private key material.
    pub fn public_pem_from_private(private_pem: &str) -> Result<String, KeyError> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(private_pem)
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        RsaPublicKey::from(&private_key)
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| KeyError::Encoding(e.to_string()))
    }
}

/// Generates a new key id in the `k-YYYY-q<1-4>-<8 lowercase hex>` format.
pub fn generate_key_id() -> String {
    let now = Utc::now();
    let quarter = (now.month() - 1) / 3 + 1;
    let mut suffix = [0u8; 4];
    rand::rngs::OsRng.fill_bytes(&mut suffix);
    format!(
        "k-{}-q{}-{}",
        now.year(),
        quarter,
        hex_lower(&suffix)
    )
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}
