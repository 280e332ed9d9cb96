//! The encrypted unit physically embedded in a carrier image.
//!
//! ```text
//! stream   = "SEAI" || envelope
//! envelope = [salt:16][nonce:12][ciphertext_len:4 BE][ciphertext][auth_tag:16]
//! ```
//!
//! The 32-byte envelope head is the fixed-width length prefix the decoder
//! reads before anything else.

use crate::crypto::{NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::{ExtractionError, TAG_SCHEMA_VERSION};

/// Marker preceding every embedded envelope.
pub const STREAM_MAGIC: &[u8; 4] = b"SEAI";

/// Length of the envelope head: salt, nonce and ciphertext length.
pub const ENVELOPE_HEAD_LEN: usize = SALT_LEN + NONCE_LEN + 4;

/// Associated data bound into every authentication tag.
pub fn associated_data() -> [u8; 5] {
    let mut aad = [0u8; 5];
    aad[..4].copy_from_slice(STREAM_MAGIC);
    aad[4] = TAG_SCHEMA_VERSION;
    aad
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub auth_tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Envelope size for a given ciphertext length.
    pub const fn encoded_len(ciphertext_len: usize) -> usize {
        ENVELOPE_HEAD_LEN + ciphertext_len + TAG_LEN
    }

    /// Total envelope size declared by a head, or `None` if it does not fit in `usize`.
    pub fn declared_len(head: &[u8; ENVELOPE_HEAD_LEN]) -> Option<usize> {
        let ct_len = u32::from_be_bytes([head[28], head[29], head[30], head[31]]) as usize;
        ENVELOPE_HEAD_LEN
            .checked_add(ct_len)
            .and_then(|n| n.checked_add(TAG_LEN))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::encoded_len(self.ciphertext.len()));
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&(self.ciphertext.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.auth_tag);
        out
    }

    /// Parse envelope bytes; the length must match the declared ciphertext length exactly.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ExtractionError> {
        let head: &[u8; ENVELOPE_HEAD_LEN] = data
            .get(..ENVELOPE_HEAD_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or(ExtractionError::NoMarker)?;

        let total = Self::declared_len(head).ok_or(ExtractionError::NoMarker)?;
        if data.len() != total {
            return Err(ExtractionError::TruncatedStream {
                declared_bits: total as u64 * 8,
                capacity_bits: data.len() as u64 * 8,
            });
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&data[..SALT_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&data[SALT_LEN..SALT_LEN + NONCE_LEN]);
        let ciphertext = data[ENVELOPE_HEAD_LEN..total - TAG_LEN].to_vec();
        let mut auth_tag = [0u8; TAG_LEN];
        auth_tag.copy_from_slice(&data[total - TAG_LEN..]);

        Ok(Self {
            salt,
            nonce,
            ciphertext,
            auth_tag,
        })
    }
}
