//! Semantic validation that goes beyond field-level `validator` checks:
//! the startup-time invariants spec §7 calls "Fatal conditions".

use crate::config::AussieConfig;
use secrecy::ExposeSecret;
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("validation failed: {0}")]
    Fields(#[from] validator::ValidationErrors),

    #[error("dangerous-noop auth is forbidden in production")]
    NoopInProduction,

    #[error("encryption key must decode to 256 bits, got {bits} bits")]
    BadEncryptionKeyLength { bits: usize },

    #[error("bootstrap is enabled but no operator key was supplied")]
    BootstrapMissingKey,

    #[error("bootstrap key must be at least 32 characters")]
    BootstrapKeyTooShort,

    #[error("two token providers share the issuer {issuer:?}")]
    DuplicateIssuer { issuer: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AussieConfig) -> Result<(), ConfigValidationError> {
        config.validate()?;
        Self::validate_noop(config)?;
        Self::validate_encryption_key(config)?;
        Self::validate_bootstrap(config)?;
        Self::validate_unique_issuers(config)?;
        Ok(())
    }

    fn validate_noop(config: &AussieConfig) -> Result<(), ConfigValidationError> {
        if config.production && config.auth.dangerous_noop {
            return Err(ConfigValidationError::NoopInProduction);
        }
        Ok(())
    }

    fn validate_encryption_key(config: &AussieConfig) -> Result<(), ConfigValidationError> {
        let Some(key) = &config.encryption.key_base64 else {
            return Ok(());
        };
        let decoded = base64_decode(key.expose_secret())
            .map_err(|_| ConfigValidationError::BadEncryptionKeyLength { bits: 0 })?;
        let bits = decoded.len() * 8;
        if bits != 256 {
            return Err(ConfigValidationError::BadEncryptionKeyLength { bits });
        }
        Ok(())
    }

    fn validate_bootstrap(config: &AussieConfig) -> Result<(), ConfigValidationError> {
        if !config.bootstrap.enabled {
            return Ok(());
        }
        match &config.bootstrap.key {
            None => Err(ConfigValidationError::BootstrapMissingKey),
            Some(key) if key.expose_secret().len() < 32 => {
                Err(ConfigValidationError::BootstrapKeyTooShort)
            }
            Some(_) => Ok(()),
        }
    }

    fn validate_unique_issuers(config: &AussieConfig) -> Result<(), ConfigValidationError> {
        let mut seen = std::collections::HashSet::new();
        for provider in &config.providers {
            if !seen.insert(provider.issuer.clone()) {
                return Err(ConfigValidationError::DuplicateIssuer {
                    issuer: provider.issuer.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Minimal, dependency-free base64 decode so this crate doesn't need to
/// pull in the `base64` crate just for a 32-byte startup check.
fn base64_decode(input: &str) -> Result<Vec<u8>, ()> {
    const TABLE: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut rev = [255u8; 256];
    for (i, &c) in TABLE.iter().enumerate() {
        rev[c as usize] = i as u8;
    }
    let input = input.trim_end_matches('=');
    let mut out = Vec::with_capacity(input.len() * 3 / 4 + 3);
    let mut buf = 0u32;
    let mut bits = 0u32;
    for c in input.bytes() {
        let v = rev[c as usize];
        if v == 255 {
            return Err(());
        }
        buf = (buf << 6) | v as u32;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((buf >> bits) as u8);
        }
    }
    Ok(out)
}
