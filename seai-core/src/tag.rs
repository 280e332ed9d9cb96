//! Seal tag: the structured plaintext hidden inside a sealed image.
//!
//! # Wire layout (all integers big-endian)
//!
//! ```text
//! [version:1][timestamp:8][generator_id_len:2][generator_id]
//! [metadata_count:2]{[key_len:2][key][val_len:2][val]}*
//! ```
//!
//! The integrity nonce is not part of these bytes: it is the AES-GCM nonce
//! and travels in the [`Envelope`](crate::envelope::Envelope).

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use crate::crypto::{generate_nonce, NONCE_LEN};
use crate::error::{DecodeError, Result, SealError, TAG_SCHEMA_VERSION};

/// Tags stamped further than this into the future are rejected on verify.
pub const MAX_CLOCK_SKEW_SECS: u64 = 300;

const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// The serialized portion of a seal tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    /// Schema version
    pub version: u8,
    /// Creation time, seconds since the Unix epoch
    pub timestamp: u64,
    /// Generator or model identifier
    pub generator_id: String,
    /// Free-form metadata, ordered by key
    pub metadata: BTreeMap<String, String>,
}

impl TagRecord {
    /// Exact number of bytes [`encode`](Self::encode) produces.
    pub fn encoded_len(&self) -> usize {
        1 + 8
            + 2
            + self.generator_id.len()
            + 2
            + self
                .metadata
                .iter()
                .map(|(k, v)| 2 + k.len() + 2 + v.len())
                .sum::<usize>()
    }

    /// Serialize to the fixed binary layout.
    ///
    /// Field lengths are bounded by [`SealTagBuilder::build`], so this cannot fail.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.push(self.version);
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        put_str(&mut buf, &self.generator_id);
        buf.extend_from_slice(&(self.metadata.len() as u16).to_be_bytes());
        for (key, value) in &self.metadata {
            put_str(&mut buf, key);
            put_str(&mut buf, value);
        }
        buf
    }

    /// Parse the fixed binary layout. Trailing bytes are malformed.
    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, DecodeError> {
        let mut reader = Reader { buf: bytes, pos: 0 };

        let version = reader.u8()?;
        if version != TAG_SCHEMA_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let timestamp = u64::from_be_bytes(
            reader
                .take(8)?
                .try_into()
                .map_err(|_| DecodeError::Malformed("timestamp"))?,
        );
        let generator_id = reader.string()?;

        let count = reader.u16()?;
        let mut metadata = BTreeMap::new();
        for _ in 0..count {
            let key = reader.string()?;
            let value = reader.string()?;
            if metadata.insert(key, value).is_some() {
                return Err(DecodeError::Malformed("duplicate metadata key"));
            }
        }

        if reader.pos != bytes.len() {
            return Err(DecodeError::Malformed("trailing bytes"));
        }

        Ok(Self {
            version,
            timestamp,
            generator_id,
            metadata,
        })
    }

    /// Semantic checks applied after a successful decode.
    pub fn validate(&self, now_secs: u64) -> std::result::Result<(), DecodeError> {
        if self.generator_id.is_empty() {
            return Err(DecodeError::Malformed("empty generator id"));
        }
        if self.timestamp > now_secs.saturating_add(MAX_CLOCK_SKEW_SECS) {
            return Err(DecodeError::Malformed("timestamp in the future"));
        }
        Ok(())
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u16).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> std::result::Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(DecodeError::Malformed("length exceeds buffer"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> std::result::Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> std::result::Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn string(&mut self) -> std::result::Result<String, DecodeError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::Malformed("invalid UTF-8"))
    }
}

/// A complete seal tag: the record plus its integrity nonce. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealTag {
    record: TagRecord,
    nonce: [u8; NONCE_LEN],
}

impl SealTag {
    pub fn builder(generator_id: impl Into<String>) -> SealTagBuilder {
        SealTagBuilder::new(generator_id)
    }

    /// Reassemble a tag recovered from an envelope.
    pub(crate) fn from_parts(record: TagRecord, nonce: [u8; NONCE_LEN]) -> Self {
        Self { record, nonce }
    }

    pub fn record(&self) -> &TagRecord {
        &self.record
    }

    pub fn version(&self) -> u8 {
        self.record.version
    }

    pub fn timestamp(&self) -> u64 {
        self.record.timestamp
    }

    pub fn generator_id(&self) -> &str {
        &self.record.generator_id
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.record.metadata
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }
}

/// Builder for [`SealTag`]. Enforces the wire-format field limits.
#[derive(Debug, Clone)]
pub struct SealTagBuilder {
    generator_id: String,
    timestamp: Option<u64>,
    metadata: BTreeMap<String, String>,
}

impl SealTagBuilder {
    pub fn new(generator_id: impl Into<String>) -> Self {
        Self {
            generator_id: generator_id.into(),
            timestamp: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Override the creation time (defaults to now).
    pub fn timestamp(mut self, secs: u64) -> Self {
        self.timestamp = Some(secs);
        self
    }

    /// Add a metadata entry. A repeated key replaces the earlier value.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn extend_metadata<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Validate limits and draw a fresh integrity nonce.
    pub fn build(self) -> Result<SealTag> {
        if self.generator_id.is_empty() {
            return Err(SealError::InvalidTag("generator id must not be empty".into()));
        }
        if self.generator_id.len() > MAX_FIELD_LEN {
            return Err(SealError::InvalidTag("generator id is too long".into()));
        }
        if self.metadata.len() > MAX_FIELD_LEN {
            return Err(SealError::InvalidTag(format!(
                "too many metadata entries: {}",
                self.metadata.len()
            )));
        }
        if let Some((key, _)) = self
            .metadata
            .iter()
            .find(|(k, v)| k.len() > MAX_FIELD_LEN || v.len() > MAX_FIELD_LEN)
        {
            return Err(SealError::InvalidTag(format!(
                "metadata entry '{}' exceeds {} bytes",
                key.chars().take(32).collect::<String>(),
                MAX_FIELD_LEN
            )));
        }

        let now = Utc::now().timestamp().max(0) as u64;
        let timestamp = self.timestamp.unwrap_or(now);
        if timestamp > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
            return Err(SealError::InvalidTag(format!(
                "timestamp {} is more than {} seconds in the future",
                timestamp, MAX_CLOCK_SKEW_SECS
            )));
        }

        Ok(SealTag {
            record: TagRecord {
                version: TAG_SCHEMA_VERSION,
                timestamp,
                generator_id: self.generator_id,
                metadata: self.metadata,
            },
            nonce: generate_nonce()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagRecord {
        SealTag::builder("diffusion-xl")
            .timestamp(1_700_000_000)
            .metadata("prompt", "a lighthouse at dusk")
            .metadata("seed", "42")
            .build()
            .unwrap()
            .record
    }

    #[test]
    fn test_encode_layout() {
        let record = TagRecord {
            version: 1,
            timestamp: 0x0102030405060708,
            generator_id: "ab".into(),
            metadata: BTreeMap::from([("k".to_string(), "vv".to_string())]),
        };
        let bytes = record.encode();
        assert_eq!(
            bytes,
            vec![
                1, 1, 2, 3, 4, 5, 6, 7, 8, // version, timestamp
                0, 2, b'a', b'b', // generator id
                0, 1, // count
                0, 1, b'k', 0, 2, b'v', b'v',
            ]
        );
        assert_eq!(bytes.len(), record.encoded_len());
    }

    #[test]
    fn test_decode_recovers_record() {
        let record = sample();
        assert_eq!(TagRecord::decode(&record.encode()).unwrap(), record);
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut bytes = sample().encode();
        bytes[0] = 9;
        assert_eq!(
            TagRecord::decode(&bytes),
            Err(DecodeError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn test_decode_rejects_overlong_length() {
        let mut bytes = sample().encode();
        // generator_id_len now claims far more bytes than remain
        bytes[9] = 0xFF;
        bytes[10] = 0xFF;
        assert!(matches!(
            TagRecord::decode(&bytes),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncation_and_trailing_bytes() {
        let bytes = sample().encode();
        for cut in 0..bytes.len() {
            assert!(TagRecord::decode(&bytes[..cut]).is_err(), "cut at {}", cut);
        }

        let mut extended = bytes.clone();
        extended.push(0);
        assert_eq!(
            TagRecord::decode(&extended),
            Err(DecodeError::Malformed("trailing bytes"))
        );
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let record = TagRecord {
            version: 1,
            timestamp: 1,
            generator_id: "ab".into(),
            metadata: BTreeMap::new(),
        };
        let mut bytes = record.encode();
        bytes[11] = 0xFF;
        assert_eq!(
            TagRecord::decode(&bytes),
            Err(DecodeError::Malformed("invalid UTF-8"))
        );
    }

    #[test]
    fn test_builder_rejects_oversized_fields() {
        assert!(SealTag::builder("").build().is_err());
        assert!(SealTag::builder("x".repeat(70_000)).build().is_err());
        assert!(SealTag::builder("gen")
            .metadata("k", "v".repeat(70_000))
            .build()
            .is_err());
    }

    #[test]
    fn test_builder_draws_fresh_nonce() {
        let a = SealTag::builder("gen").build().unwrap();
        let b = SealTag::builder("gen").build().unwrap();
        assert_ne!(a.nonce(), b.nonce());
        assert_eq!(a.version(), TAG_SCHEMA_VERSION);
    }

    #[test]
    fn test_validate_rejects_future_timestamp() {
        let mut record = sample();
        record.timestamp = 10_000;
        assert!(record.validate(10_000 - MAX_CLOCK_SKEW_SECS).is_ok());
        assert!(record.validate(10_000 - MAX_CLOCK_SKEW_SECS - 1).is_err());
    }

    #[test]
    fn test_builder_rejects_future_timestamp() {
        let err = SealTag::builder("gen")
            .timestamp(4_102_444_800)
            .build()
            .unwrap_err();
        assert!(matches!(err, SealError::InvalidTag(_)));

        let now = Utc::now().timestamp() as u64;
        let tag = SealTag::builder("gen").timestamp(now + 60).build().unwrap();
        assert!(tag.record().validate(now).is_ok());
    }
}
