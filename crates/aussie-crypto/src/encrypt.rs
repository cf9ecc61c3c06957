//! AES-256-GCM encryption-at-rest for sensitive records (spec §4.12).
//!
//! Wire format (before base64): `[1-byte keyIdLen][keyId][12-byte IV][ciphertext+tag]`.
//! When encryption is disabled at construction the output is
//! `"PLAIN:" + base64(plaintext)`; decryption accepts the PLAIN form
//! regardless of whether encryption is currently enabled, so rotating
//! *into* encryption doesn't strand previously written plaintext
//! records.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use thiserror::Error;
use tracing::warn;

const PLAIN_PREFIX: &str = "PLAIN:";
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum EncryptError {
    #[error("encryption key must be 256 bits, got {bits} bits")]
    BadKeyLength { bits: usize },
    #[error("key id must be 255 bytes or fewer")]
    KeyIdTooLong,
    #[error("AES-GCM operation failed")]
    Cipher,
    #[error("malformed ciphertext envelope")]
    Malformed,
    #[error("invalid base64 envelope")]
    Base64,
}

enum Mode {
    Disabled,
    Enabled { cipher: Aes256Gcm, key_id: String },
}

pub struct EncryptionService {
    mode: Mode,
}

impl EncryptionService {
    pub fn disabled() -> Self {
        Self {
            mode: Mode::Disabled,
        }
    }

    /// `key` must be exactly 32 bytes (256 bits); validated here because
    /// this is a startup-only fatal condition per spec §7.
    pub fn new(key: &[u8], key_id: impl Into<String>) -> Result<Self, EncryptError> {
        if key.len() != 32 {
            return Err(EncryptError::BadKeyLength {
                bits: key.len() * 8,
            });
        }
        let key_id = key_id.into();
        if key_id.len() > 255 {
            return Err(EncryptError::KeyIdTooLong);
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Ok(Self {
            mode: Mode::Enabled { cipher, key_id },
        })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, EncryptError> {
        match &self.mode {
            Mode::Disabled => Ok(format!("{PLAIN_PREFIX}{}", STANDARD.encode(plaintext))),
            Mode::Enabled { cipher, key_id } => {
                let mut nonce_bytes = [0u8; NONCE_LEN];
                rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
                let nonce = Nonce::from_slice(&nonce_bytes);
                let ciphertext = cipher
                    .encrypt(nonce, plaintext)
                    .map_err(|_| EncryptError::Cipher)?;

                let key_id_bytes = key_id.as_bytes();
                let mut envelope =
                    Vec::with_capacity(1 + key_id_bytes.len() + NONCE_LEN + ciphertext.len());
                envelope.push(key_id_bytes.len() as u8);
                envelope.extend_from_slice(key_id_bytes);
                envelope.extend_from_slice(&nonce_bytes);
                envelope.extend_from_slice(&ciphertext);

                Ok(STANDARD.encode(envelope))
            }
        }
    }

    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, EncryptError> {
        if let Some(rest) = encoded.strip_prefix(PLAIN_PREFIX) {
            return STANDARD.decode(rest).map_err(|_| EncryptError::Base64);
        }

        let Mode::Enabled { cipher, key_id } = &self.mode else {
            // No key configured and the record isn't PLAIN: nothing we can do.
            return Err(EncryptError::Malformed);
        };

        let envelope = STANDARD.decode(encoded).map_err(|_| EncryptError::Base64)?;
        if envelope.is_empty() {
            return Err(EncryptError::Malformed);
        }
        let key_id_len = envelope[0] as usize;
        let min_len = 1 + key_id_len + NONCE_LEN;
        if envelope.len() < min_len {
            return Err(EncryptError::Malformed);
        }

        let stored_key_id = &envelope[1..1 + key_id_len];
        if stored_key_id != key_id.as_bytes() {
            // Key rotation support: mismatched key id is logged, not fatal.
            warn!(
                stored = %String::from_utf8_lossy(stored_key_id),
                current = %key_id,
                "encryption key id mismatch on decrypt"
            );
        }

        let nonce_start = 1 + key_id_len;
        let nonce = Nonce::from_slice(&envelope[nonce_start..nonce_start + NONCE_LEN]);
        let ciphertext = &envelope[nonce_start + NONCE_LEN..];

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| EncryptError::Cipher)
    }
}
