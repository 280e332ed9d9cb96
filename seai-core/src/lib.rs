//! SeAI Core - encrypted provenance tags hidden in image pixels
//!
//! This crate builds a SeAl tag asserting that an image is AI-generated,
//! encrypts it, and hides it in the least significant bits of the image's
//! pixel channels. Verification extracts the tag, authenticates it and reports
//! whether it is genuine.
//!
//! # Features
//!
//! - AES-256-GCM authenticated encryption (tamper-evident tags)
//! - PBKDF2-HMAC-SHA256 key derivation with a fresh salt per image
//! - Deterministic LSB embedding, one bit per color channel byte
//! - Lossless PNG output regardless of input format
//! - Secret material zeroized on drop
//!
//! # Example
//!
//! ```no_run
//! use seai_core::{MasterSecret, SealConfig, SealEngine};
//!
//! # fn example(image: &[u8]) -> seai_core::Result<()> {
//! let secret = MasterSecret::from_env()?;
//! let engine = SealEngine::new(SealConfig::from_env(), secret)?;
//!
//! let tag = engine
//!     .tag_builder()
//!     .metadata("model", "diffusion-xl")
//!     .build()?;
//! let sealed = engine.embed(image, &tag)?;
//!
//! let result = engine.verify(&sealed.png)?;
//! assert!(result.is_verified());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod service;
pub mod stego;
pub mod tag;

// Re-export main types for convenience
pub use config::{ChannelSelection, SealConfig};
pub use crypto::{
    check_key_strength, fingerprint, generate_master_key, KeyDeriver, KeyMaterial, KeyWeakness,
    MasterSecret,
};
pub use engine::{ReasonCode, SealEngine, SealedImage, Verdict, VerificationResult};
pub use envelope::Envelope;
pub use error::{
    AuthFailure, CapacityError, DecodeError, ErrorKind, ExtractionError, Result, SealError,
    TAG_SCHEMA_VERSION,
};
pub use stego::{CapacityPlanner, CapacityReport, CarrierImage, LsbDecoder, LsbEncoder};
pub use tag::{SealTag, SealTagBuilder, TagRecord};
