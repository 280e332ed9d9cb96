//! Upload-facing contract for sealing and verifying images.
//!
//! Transport-agnostic request handlers: callers hand in raw upload bytes and
//! a client filename, and get back serializable response bodies. Uploads are
//! screened by extension and size before any decoding happens.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SealConfig;
use crate::engine::{ReasonCode, SealEngine, VerificationResult};
use crate::error::{ErrorKind, SealError};

/// File extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

pub const APPLICATION_NAME: &str = "SeAI - AI Image Seal Verification System";

const BYTES_PER_MB: usize = 1024 * 1024;

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorBody {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }
}

impl From<&SealError> for ErrorBody {
    fn from(err: &SealError) -> Self {
        let message = match err {
            SealError::ImageTooSmall { .. } => {
                format!("Image too small for embedding SeAl tag: {}", err)
            }
            // Keep crypto detail out of responses
            SealError::Crypto(_) => "Failed to embed SeAl tag".to_string(),
            _ => err.to_string(),
        };
        Self::new(err.kind(), message)
    }
}

impl From<SealError> for ErrorBody {
    fn from(err: SealError) -> Self {
        Self::from(&err)
    }
}

/// An image upload to be sealed.
#[derive(Debug, Clone)]
pub struct EmbedRequest<'a> {
    pub image: &'a [u8],
    /// Client-supplied filename
    pub filename: &'a str,
    /// Extra metadata recorded in the tag
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedResponse {
    pub success: bool,
    pub message: String,
    /// Server-side name for the sealed PNG: `<uuid>_sealed.png`
    pub filename: String,
    pub original_filename: String,
    pub width: u32,
    pub height: u32,
    pub payload_bits: u64,
    pub capacity_bits: u64,
    /// Sealed PNG bytes
    #[serde(skip)]
    pub sealed_image: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
    pub reason: ReasonCode,
    pub message: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl From<&VerificationResult> for VerifyResponse {
    fn from(result: &VerificationResult) -> Self {
        let message = if result.is_verified() {
            "SeAl tag verified!"
        } else {
            "This image was not generated by AI."
        };
        let tag = result.tag.as_ref();
        Self {
            verified: result.is_verified(),
            reason: result.reason,
            message: message.to_string(),
            details: result.reason.description().to_string(),
            generator_id: tag.map(|t| t.generator_id().to_string()),
            timestamp: tag.map(|t| t.timestamp()),
            metadata: result.metadata().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub application: &'static str,
    pub version: &'static str,
    pub encryption: &'static str,
    pub key_derivation: String,
    pub steganography: &'static str,
    pub supported_formats: Vec<&'static str>,
    pub max_file_size_mb: f64,
}

/// Reduce a client filename to a safe basename: ASCII alphanumerics, `.`, `-`
/// and `_` only, spaces become underscores, leading dots are dropped.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Check the filename carries an allowed extension. Returns the lowercased extension.
pub fn validate_filename(filename: &str) -> Result<String, ErrorBody> {
    if filename.trim().is_empty() {
        return Err(ErrorBody::invalid_request("No file selected"));
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(ErrorBody::invalid_request(
            "Invalid file type. Allowed: PNG, JPG, JPEG, BMP",
        ))
    }
}

/// Reject uploads larger than `max_size` bytes.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ErrorBody> {
    if size == 0 {
        return Err(ErrorBody::invalid_request("No image file provided"));
    }
    if size > max_size {
        return Err(ErrorBody::new(
            ErrorKind::FileTooLarge,
            format!(
                "File too large. Maximum size is {}MB",
                max_size / BYTES_PER_MB
            ),
        ));
    }
    Ok(())
}

/// Seal an uploaded image.
///
/// The tag records the sanitized original filename and an RFC 3339 `sealed_at`
/// time on top of any caller metadata.
pub fn embed(engine: &SealEngine, request: EmbedRequest<'_>) -> Result<EmbedResponse, ErrorBody> {
    validate_filename(request.filename)?;
    validate_file_size(request.image.len(), engine.config().max_upload_bytes)?;

    let original_filename = sanitize_filename(request.filename);
    let tag = engine
        .tag_builder()
        .extend_metadata(request.metadata)
        .metadata("original_filename", original_filename.clone())
        .metadata("sealed_at", Utc::now().to_rfc3339())
        .build()?;

    let sealed = engine.embed(request.image, &tag).map_err(|e| {
        warn!(error = %e, filename = %original_filename, "Embed request failed");
        ErrorBody::from(&e)
    })?;

    let filename = format!("{}_sealed.png", Uuid::new_v4());
    info!(%filename, %original_filename, "Embed request served");

    Ok(EmbedResponse {
        success: true,
        message: "SeAl tag successfully embedded".to_string(),
        filename,
        original_filename,
        width: sealed.width,
        height: sealed.height,
        payload_bits: sealed.payload_bits,
        capacity_bits: sealed.capacity_bits,
        sealed_image: sealed.png,
    })
}

/// Verify an uploaded image. A missing or invalid tag is a normal response,
/// not an error.
pub fn verify(engine: &SealEngine, image: &[u8], filename: &str) -> Result<VerifyResponse, ErrorBody> {
    validate_filename(filename)?;
    validate_file_size(image.len(), engine.config().max_upload_bytes)?;

    let result = engine.verify(image)?;
    Ok(VerifyResponse::from(&result))
}

pub fn info(config: &SealConfig) -> ServiceInfo {
    ServiceInfo {
        application: APPLICATION_NAME,
        version: env!("CARGO_PKG_VERSION"),
        encryption: "AES-256-GCM",
        key_derivation: format!(
            "PBKDF2-HMAC-SHA256 ({} iterations)",
            config.pbkdf2_iterations
        ),
        steganography: "LSB (Least Significant Bit)",
        supported_formats: ALLOWED_EXTENSIONS.to_vec(),
        max_file_size_mb: config.max_upload_bytes as f64 / BYTES_PER_MB as f64,
    }
}
