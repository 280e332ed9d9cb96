use std::fmt;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Result, SealError};

/// Length of the derived key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the per-image salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Lowest accepted PBKDF2 iteration count.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Process-wide master secret. Zeroized on drop, redacted in `Debug`.
#[derive(Clone)]
pub struct MasterSecret(Zeroizing<Vec<u8>>);

impl MasterSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(SealError::Config("master secret must not be empty".into()));
        }
        Ok(Self(secret))
    }

    /// Read the master secret from `SEAL_MASTER_KEY`.
    pub fn from_env() -> Result<Self> {
        let value = std::env::var("SEAL_MASTER_KEY")
            .map_err(|_| SealError::Config("SEAL_MASTER_KEY is not set".into()))?;
        Self::new(value.into_bytes())
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret([REDACTED])")
    }
}

/// Key derived for a single image, together with the salt and iteration
/// count that produced it.
pub struct KeyMaterial {
    key: Zeroizing<[u8; KEY_LEN]>,
    salt: [u8; SALT_LEN],
    iterations: u32,
}

impl KeyMaterial {
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub(crate) fn key_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"[REDACTED]")
            .field("salt", &hex::encode(self.salt))
            .field("iterations", &self.iterations)
            .finish()
    }
}

/// Derive a 256-bit key with PBKDF2-HMAC-SHA256.
///
/// Deterministic: the same secret, salt and iteration count always yield the
/// same key. Weak parameters are rejected, never silently accepted.
pub fn derive_key(secret: &[u8], salt: &[u8], iterations: u32) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    if secret.is_empty() {
        return Err(SealError::Config("secret must not be empty".into()));
    }
    if salt.len() < SALT_LEN {
        return Err(SealError::Config(format!(
            "salt must be at least {} bytes, got {}",
            SALT_LEN,
            salt.len()
        )));
    }
    if iterations < MIN_ITERATIONS {
        return Err(SealError::Config(format!(
            "PBKDF2 iteration count {} is below the minimum of {}",
            iterations, MIN_ITERATIONS
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(secret, salt, iterations, &mut key[..]);
    Ok(key)
}

/// Holds the master secret and iteration count; derives per-image keys.
///
/// Immutable after construction and shared by all concurrent operations.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    secret: MasterSecret,
    iterations: u32,
}

impl KeyDeriver {
    pub fn new(secret: MasterSecret, iterations: u32) -> Result<Self> {
        if iterations < MIN_ITERATIONS {
            return Err(SealError::Config(format!(
                "PBKDF2 iteration count {} is below the minimum of {}",
                iterations, MIN_ITERATIONS
            )));
        }
        Ok(Self { secret, iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn derive(&self, salt: &[u8; SALT_LEN]) -> Result<KeyMaterial> {
        let key = derive_key(self.secret.expose(), salt, self.iterations)?;
        Ok(KeyMaterial {
            key,
            salt: *salt,
            iterations: self.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kdf_is_deterministic() {
        let salt = [42u8; SALT_LEN];
        let k1 = derive_key(b"password", &salt, MIN_ITERATIONS).unwrap();
        let k2 = derive_key(b"password", &salt, MIN_ITERATIONS).unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn test_kdf_salt_affects_output() {
        let k1 = derive_key(b"pw", &[1u8; SALT_LEN], MIN_ITERATIONS).unwrap();
        let k2 = derive_key(b"pw", &[2u8; SALT_LEN], MIN_ITERATIONS).unwrap();
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn test_kdf_rejects_weak_parameters() {
        assert!(derive_key(b"", &[0u8; SALT_LEN], MIN_ITERATIONS).is_err());
        assert!(derive_key(b"pw", &[0u8; 15], MIN_ITERATIONS).is_err());
        assert!(derive_key(b"pw", &[0u8; SALT_LEN], MIN_ITERATIONS - 1).is_err());
    }

    #[test]
    fn test_kdf_matches_rfc7914_vector() {
        // PBKDF2-HMAC-SHA256("passwd", "salt", 1) from RFC 7914 §11, via the raw primitive.
        let mut out = [0u8; 32];
        pbkdf2_hmac::<Sha256>(b"passwd", b"salt", 1, &mut out);
        assert_eq!(
            hex::encode(out),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn test_deriver_rejects_low_iterations() {
        let secret = MasterSecret::new("secret").unwrap();
        assert!(KeyDeriver::new(secret, 1_000).is_err());
    }

    #[test]
    fn test_empty_master_secret_rejected() {
        assert!(MasterSecret::new(Vec::<u8>::new()).is_err());
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let secret = MasterSecret::new("hunter2-hunter2").unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter2"));

        let deriver = KeyDeriver::new(secret, MIN_ITERATIONS).unwrap();
        let material = deriver.derive(&[9u8; SALT_LEN]).unwrap();
        let debug = format!("{:?}", material);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&hex::encode(material.key_bytes())));
    }
}
