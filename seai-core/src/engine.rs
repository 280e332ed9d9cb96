//! Seal engine: composes tag encoding, encryption and LSB embedding.
//!
//! Embedding is a linear, all-or-nothing pipeline:
//!
//! ```text
//! SealTag -> TagRecord bytes -> capacity check -> PBKDF2 key (fresh salt)
//!         -> AES-256-GCM (tag nonce) -> Envelope -> LSB encode -> PNG
//! ```
//!
//! Verification never treats a negative outcome as an error:
//!
//! ```text
//! LSB decode --(no marker / truncated)--> NoTagFound
//!   -> Envelope -> AES-256-GCM decrypt --(auth failure)--> TamperedOrWrongKey
//!   -> TagRecord decode + validate --(malformed)--> CorruptTag
//!   -> Verified(tag)
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::SealConfig;
use crate::crypto::{
    check_key_strength, generate_salt, AuthenticatedCipher, KeyDeriver, MasterSecret,
};
use crate::envelope::{associated_data, Envelope, STREAM_MAGIC};
use crate::error::{Result, SealError};
use crate::stego::{CapacityPlanner, CapacityReport, CarrierImage, LsbDecoder, LsbEncoder};
use crate::tag::{SealTag, SealTagBuilder, TagRecord};

/// Outcome of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Verified,
    NotVerified,
}

/// Coarse reason attached to every verdict. Carries no cryptographic detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReasonCode {
    Verified,
    NoTagFound,
    TamperedOrWrongKey,
    CorruptTag,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Verified => "Verified",
            ReasonCode::NoTagFound => "NoTagFound",
            ReasonCode::TamperedOrWrongKey => "TamperedOrWrongKey",
            ReasonCode::CorruptTag => "CorruptTag",
        }
    }

    /// Human-readable description of the reason.
    pub fn description(&self) -> &'static str {
        match self {
            ReasonCode::Verified => "This image contains a valid AI-generated SeAl tag.",
            ReasonCode::NoTagFound => "No valid SeAl tag found in the image.",
            ReasonCode::TamperedOrWrongKey => "SeAl tag found but verification failed.",
            ReasonCode::CorruptTag => "SeAl tag authenticated but its contents are invalid.",
        }
    }
}

/// Result of [`SealEngine::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub verdict: Verdict,
    pub reason: ReasonCode,
    /// Recovered tag, present only when verified
    pub tag: Option<SealTag>,
}

impl VerificationResult {
    fn verified(tag: SealTag) -> Self {
        Self {
            verdict: Verdict::Verified,
            reason: ReasonCode::Verified,
            tag: Some(tag),
        }
    }

    fn rejected(reason: ReasonCode) -> Self {
        Self {
            verdict: Verdict::NotVerified,
            reason,
            tag: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verdict == Verdict::Verified
    }

    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        self.tag.as_ref().map(SealTag::metadata)
    }
}

/// A sealed image ready to hand back to the caller.
#[derive(Debug, Clone)]
pub struct SealedImage {
    /// Lossless PNG bytes
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bits written into the carrier, magic included
    pub payload_bits: u64,
    pub capacity_bits: u64,
}

/// Embeds and verifies seal tags.
///
/// Holds only immutable state, so one engine can be shared by reference
/// across threads.
#[derive(Debug)]
pub struct SealEngine {
    config: SealConfig,
    keys: KeyDeriver,
    planner: CapacityPlanner,
    encoder: LsbEncoder,
    decoder: LsbDecoder,
}

impl SealEngine {
    /// Build an engine. Invalid configuration is rejected here, at startup.
    pub fn new(config: SealConfig, secret: MasterSecret) -> Result<Self> {
        config.validate()?;

        match std::str::from_utf8(secret.expose()) {
            Ok(text) => {
                if let Err(weakness) = check_key_strength(text) {
                    warn!(%weakness, "Master secret is weak");
                }
            }
            Err(_) => debug!("Master secret is not UTF-8; skipping strength check"),
        }

        let keys = KeyDeriver::new(secret, config.pbkdf2_iterations)?;
        let planner = CapacityPlanner::from_config(&config);

        info!(
            iterations = config.pbkdf2_iterations,
            min_dimension = config.min_dimension,
            channels = ?config.channels,
            "Seal engine ready"
        );

        Ok(Self {
            encoder: LsbEncoder::new(config.channels),
            decoder: LsbDecoder::new(config.channels),
            config,
            keys,
            planner,
        })
    }

    pub fn config(&self) -> &SealConfig {
        &self.config
    }

    pub fn planner(&self) -> &CapacityPlanner {
        &self.planner
    }

    /// Start a tag stamped with the configured generator id.
    pub fn tag_builder(&self) -> SealTagBuilder {
        SealTag::builder(self.config.generator_id.clone())
    }

    /// Decode `image`, embed `tag`, and return the sealed PNG.
    pub fn embed(&self, image: &[u8], tag: &SealTag) -> Result<SealedImage> {
        let carrier = CarrierImage::from_bytes(image)?;
        let capacity_bits = self.planner.capacity_bits(&carrier);
        let (sealed, payload_bits) = self.embed_carrier(carrier, tag)?;

        let png = sealed.to_png()?;
        Ok(SealedImage {
            png,
            width: sealed.width(),
            height: sealed.height(),
            payload_bits,
            capacity_bits,
        })
    }

    /// Embed into an already decoded carrier. Returns the sealed carrier and
    /// the number of bits written.
    pub fn embed_carrier(&self, carrier: CarrierImage, tag: &SealTag) -> Result<(CarrierImage, u64)> {
        self.planner.check_dimensions(&carrier)?;

        let plaintext = Zeroizing::new(tag.record().encode());
        if plaintext.len() > u32::MAX as usize {
            return Err(SealError::InvalidTag("encoded tag exceeds 4 GiB".into()));
        }
        let envelope_len = Envelope::encoded_len(plaintext.len());
        self.planner.check(&carrier, envelope_len as u64 * 8)?;

        let salt = generate_salt()?;
        let key = self.keys.derive(&salt)?;
        let cipher = AuthenticatedCipher::new(&key)?;
        let (ciphertext, auth_tag) = cipher.encrypt(&plaintext, tag.nonce(), &associated_data())?;

        let envelope = Envelope {
            salt,
            nonce: *tag.nonce(),
            ciphertext,
            auth_tag,
        };
        let mut stream = Vec::with_capacity(STREAM_MAGIC.len() + envelope_len);
        stream.extend_from_slice(STREAM_MAGIC);
        stream.extend_from_slice(&envelope.to_bytes());

        let sealed = self.encoder.encode(carrier, &stream)?;
        let written = stream.len() as u64 * 8;
        info!(
            width = sealed.width(),
            height = sealed.height(),
            payload_bits = written,
            metadata_entries = tag.metadata().len(),
            "Seal embedded"
        );
        Ok((sealed, written))
    }

    /// Report the capacity of `image` without modifying it.
    pub fn capacity_report(&self, image: &[u8]) -> Result<CapacityReport> {
        Ok(self.planner.report(&CarrierImage::from_bytes(image)?))
    }

    /// Decode `image` and verify any embedded tag.
    ///
    /// Only an undecodable image is an error; every other outcome is a verdict.
    pub fn verify(&self, image: &[u8]) -> Result<VerificationResult> {
        let carrier = CarrierImage::from_bytes(image)?;
        Ok(self.verify_carrier(&carrier))
    }

    pub fn verify_carrier(&self, carrier: &CarrierImage) -> VerificationResult {
        let result = self.run_verification(carrier);
        info!(
            verified = result.is_verified(),
            reason = result.reason.as_str(),
            "Verification complete"
        );
        result
    }

    fn run_verification(&self, carrier: &CarrierImage) -> VerificationResult {
        let bytes = match self.decoder.decode(carrier) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "No envelope extracted");
                return VerificationResult::rejected(ReasonCode::NoTagFound);
            }
        };

        let envelope = match Envelope::from_bytes(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "Envelope did not parse");
                return VerificationResult::rejected(ReasonCode::NoTagFound);
            }
        };

        // Derivation only fails on parameters already validated at construction.
        let key = match self.keys.derive(&envelope.salt) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Key derivation failed during verification");
                return VerificationResult::rejected(ReasonCode::TamperedOrWrongKey);
            }
        };
        let cipher = match AuthenticatedCipher::new(&key) {
            Ok(cipher) => cipher,
            Err(_) => return VerificationResult::rejected(ReasonCode::TamperedOrWrongKey),
        };

        let plaintext = match cipher.decrypt(
            &envelope.ciphertext,
            &envelope.auth_tag,
            &envelope.nonce,
            &associated_data(),
        ) {
            Ok(plaintext) => plaintext,
            Err(_) => return VerificationResult::rejected(ReasonCode::TamperedOrWrongKey),
        };

        let now = Utc::now().timestamp().max(0) as u64;
        let record = match TagRecord::decode(&plaintext).and_then(|r| r.validate(now).map(|_| r)) {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "Authenticated tag failed to decode");
                return VerificationResult::rejected(ReasonCode::CorruptTag);
            }
        };

        VerificationResult::verified(SealTag::from_parts(record, envelope.nonce))
    }
}
