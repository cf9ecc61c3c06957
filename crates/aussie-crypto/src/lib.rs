//! Crypto primitives for the Aussie auth core: signing keypair
//! generation, JWS sign/verify, SHA-256 hashing/randomness, and
//! AES-256-GCM encryption-at-rest.

pub mod encrypt;
pub mod hashing;
pub mod jws;
pub mod keys;

pub use encrypt::{EncryptError, EncryptionService};
pub use jws::{decoding_key_from_jwk, sign, verify, JwsError};
pub use keys::{generate_key_id, KeyError, KeyMaterial};
