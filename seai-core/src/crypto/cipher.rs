use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use zeroize::Zeroizing;

use super::kdf::{KeyMaterial, SALT_LEN};
use super::secure_random;
use crate::error::{AuthFailure, Result, SealError};

/// AES-GCM nonce length (96 bits).
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length (128 bits).
pub const TAG_LEN: usize = 16;

/// Generate a fresh random 96-bit nonce.
pub fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;
    Ok(nonce)
}

/// Generate a fresh random salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// AES-256-GCM with a detached authentication tag.
pub struct AuthenticatedCipher {
    cipher: Aes256Gcm,
}

impl AuthenticatedCipher {
    pub fn new(key: &KeyMaterial) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key.key_bytes())
            .map_err(|_| SealError::Crypto("invalid AES-256 key length".into()))?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext`. Ciphertext length equals plaintext length; the tag
    /// authenticates both the ciphertext and `aad`.
    ///
    /// The nonce must never repeat under the same key.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, &mut buffer)
            .map_err(|_| SealError::Crypto("encryption failed".into()))?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(&tag);
        Ok((buffer, tag_bytes))
    }

    /// Decrypt and authenticate. Fails closed: on any mismatch no plaintext
    /// is returned. Tag comparison is constant-time.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        tag: &[u8; TAG_LEN],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
    ) -> std::result::Result<Zeroizing<Vec<u8>>, AuthFailure> {
        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                aad,
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| AuthFailure)?;
        Ok(buffer)
    }
}
