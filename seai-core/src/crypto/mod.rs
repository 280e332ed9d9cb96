//! Cryptographic primitives for seal tags.
//!
//! Key derivation (PBKDF2-HMAC-SHA256), authenticated encryption
//! (AES-256-GCM) and master-key management helpers.

pub mod cipher;
pub mod kdf;
pub mod keys;

pub use cipher::{generate_nonce, generate_salt, AuthenticatedCipher, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, KeyDeriver, KeyMaterial, MasterSecret, KEY_LEN, SALT_LEN};
pub use keys::{check_key_strength, fingerprint, generate_master_key, KeyWeakness};

use crate::error::{Result, SealError};

/// Fill buffer with cryptographically secure random bytes.
pub(crate) fn secure_random(buf: &mut [u8]) -> Result<()> {
    getrandom::fill(buf).map_err(|_| SealError::Crypto("OS random generator unavailable".into()))
}
