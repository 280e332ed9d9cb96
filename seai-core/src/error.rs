use serde::Serialize;
use thiserror::Error;

/// Current TagRecord schema version. Also bound into the AEAD associated data.
pub const TAG_SCHEMA_VERSION: u8 = 1;

/// Errors that abort an embed, or a verify that cannot even read its input.
///
/// Negative verification verdicts are not errors; see
/// [`VerificationResult`](crate::VerificationResult).
#[derive(Error, Debug)]
pub enum SealError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image too small: {width}x{height} (minimum {min}x{min})")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    #[error("Capacity exceeded: payload needs {required_bits} bits, image holds {capacity_bits}")]
    CapacityExceeded {
        required_bits: u64,
        capacity_bits: u64,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid seal tag: {0}")]
    InvalidTag(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Stable error codes exposed at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ConfigError,
    ImageTooSmall,
    CapacityExceeded,
    UnsupportedFormat,
    InvalidTag,
    CryptoError,
    IoError,
    /// Upload rejected before decoding: missing name or disallowed extension
    InvalidRequest,
    FileTooLarge,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigError => "ConfigError",
            ErrorKind::ImageTooSmall => "ImageTooSmall",
            ErrorKind::CapacityExceeded => "CapacityExceeded",
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::InvalidTag => "InvalidTag",
            ErrorKind::CryptoError => "CryptoError",
            ErrorKind::IoError => "IoError",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::FileTooLarge => "FileTooLarge",
        }
    }
}

impl SealError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SealError::Config(_) => ErrorKind::ConfigError,
            SealError::ImageTooSmall { .. } => ErrorKind::ImageTooSmall,
            SealError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            SealError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            SealError::InvalidTag(_) => ErrorKind::InvalidTag,
            SealError::Crypto(_) => ErrorKind::CryptoError,
            SealError::Encoding(_) => ErrorKind::IoError,
        }
    }
}

/// TagRecord decoding failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed tag record: {0}")]
    Malformed(&'static str),

    #[error("unsupported tag record version: {0}")]
    UnsupportedVersion(u8),
}

/// AEAD tag mismatch. Deliberately carries no detail.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("authentication failed")]
pub struct AuthFailure;

/// Failure to recover an envelope from carrier pixels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no seal marker present")]
    NoMarker,

    #[error("declared stream of {declared_bits} bits exceeds capacity of {capacity_bits} bits")]
    TruncatedStream {
        declared_bits: u64,
        capacity_bits: u64,
    },
}

/// Capacity policy violation, raised before any pixel is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("image {width}x{height} is below the {min}px minimum")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    #[error("payload needs {required_bits} bits, image holds {capacity_bits}")]
    CapacityExceeded {
        required_bits: u64,
        capacity_bits: u64,
    },
}

impl From<CapacityError> for SealError {
    fn from(err: CapacityError) -> Self {
        match err {
            CapacityError::ImageTooSmall { width, height, min } => {
                SealError::ImageTooSmall { width, height, min }
            }
            CapacityError::CapacityExceeded {
                required_bits,
                capacity_bits,
            } => SealError::CapacityExceeded {
                required_bits,
                capacity_bits,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SealError>;
