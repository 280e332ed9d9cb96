//! Master-key management helpers.

use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::secure_random;
use crate::error::{Result, SealError};

/// Length of generated master keys unless the caller asks otherwise.
pub const DEFAULT_MASTER_KEY_LEN: usize = 64;

/// Shortest master key considered strong.
pub const MIN_MASTER_KEY_LEN: usize = 32;

const KEY_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Why a master key failed the strength check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWeakness {
    TooShort { len: usize },
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
}

impl fmt::Display for KeyWeakness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyWeakness::TooShort { len } => write!(
                f,
                "key is {} characters long, at least {} required",
                len, MIN_MASTER_KEY_LEN
            ),
            KeyWeakness::MissingUppercase => write!(f, "key has no upper-case letter"),
            KeyWeakness::MissingLowercase => write!(f, "key has no lower-case letter"),
            KeyWeakness::MissingDigit => write!(f, "key has no digit"),
        }
    }
}

/// Draws tried before giving up on a key that meets the strength policy.
const MAX_KEY_ATTEMPTS: usize = 16;

/// Generate a random master key over letters, digits and punctuation.
///
/// Characters are rejection-sampled so every symbol is equally likely.
pub fn generate_master_key(length: usize) -> Result<Zeroizing<String>> {
    if length < MIN_MASTER_KEY_LEN {
        return Err(SealError::Config(format!(
            "master key length must be at least {}",
            MIN_MASTER_KEY_LEN
        )));
    }

    // A draw lacking a required character class is rare at 32+ characters.
    for _ in 0..MAX_KEY_ATTEMPTS {
        let key = draw_key(length)?;
        if check_key_strength(&key).is_ok() {
            return Ok(key);
        }
    }
    Err(SealError::Crypto(
        "could not generate a master key meeting the strength policy".into(),
    ))
}

fn draw_key(length: usize) -> Result<Zeroizing<String>> {
    // Largest multiple of the alphabet size that fits in a byte.
    let limit = 256 - (256 % KEY_ALPHABET.len());
    let mut key = Zeroizing::new(String::with_capacity(length));
    let mut pool = Zeroizing::new([0u8; 64]);

    while key.len() < length {
        secure_random(&mut pool[..])?;
        for &byte in pool.iter() {
            if (byte as usize) < limit && key.len() < length {
                key.push(KEY_ALPHABET[byte as usize % KEY_ALPHABET.len()] as char);
            }
        }
    }
    Ok(key)
}

/// Check a master key against the strength policy.
pub fn check_key_strength(key: &str) -> std::result::Result<(), KeyWeakness> {
    let len = key.chars().count();
    if len < MIN_MASTER_KEY_LEN {
        return Err(KeyWeakness::TooShort { len });
    }
    if !key.chars().any(|c| c.is_uppercase()) {
        return Err(KeyWeakness::MissingUppercase);
    }
    if !key.chars().any(|c| c.is_lowercase()) {
        return Err(KeyWeakness::MissingLowercase);
    }
    if !key.chars().any(|c| c.is_ascii_digit()) {
        return Err(KeyWeakness::MissingDigit);
    }
    Ok(())
}

/// SHA-256 fingerprint of a key, lowercase hex. Safe to display and log.
pub fn fingerprint(key: &[u8]) -> String {
    hex::encode(Sha256::digest(key))
}
