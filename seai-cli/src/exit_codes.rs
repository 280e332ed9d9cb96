//! Exit codes following sysexits.h conventions.
//!
//! These codes let scripts and CI systems tell a missing seal apart from a
//! missing file or a misconfigured secret.

use std::fmt;
use std::io;

use seai_core::{ErrorKind, SealError};

/// Successful execution (for `verify`: the seal is authentic).
pub const SUCCESS: u8 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: u8 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: u8 = 64;

/// Data format error: seal not verified, image too small or undecodable.
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: u8 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: u8 = 66;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: u8 = 74;

/// Missing or invalid configuration, such as an unset master secret.
/// Maps to EX_CONFIG from sysexits.h.
pub const CONFIG_ERROR: u8 = 78;

/// An error that carries its own exit code.
#[derive(Debug)]
pub struct Failure {
    pub code: u8,
    pub message: String,
}

impl Failure {
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            code: USAGE_ERROR,
            message: message.into(),
        }
    }

    pub fn not_verified(message: impl Into<String>) -> Self {
        Self {
            code: DATA_ERROR,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Failure {}

/// Process exit status with optional error context.
pub struct ExitStatus {
    pub code: u8,
    pub message: Option<String>,
}

impl ExitStatus {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        Self {
            code: classify(err),
            message: Some(message),
        }
    }
}

fn classify(err: &anyhow::Error) -> u8 {
    if let Some(failure) = err.chain().find_map(|e| e.downcast_ref::<Failure>()) {
        return failure.code;
    }

    if let Some(seal) = err.chain().find_map(|e| e.downcast_ref::<SealError>()) {
        return match seal.kind() {
            ErrorKind::ConfigError => CONFIG_ERROR,
            ErrorKind::ImageTooSmall
            | ErrorKind::CapacityExceeded
            | ErrorKind::UnsupportedFormat
            | ErrorKind::InvalidTag => DATA_ERROR,
            ErrorKind::IoError => IO_ERROR,
            _ => GENERAL_ERROR,
        };
    }

    if let Some(io_err) = err.chain().find_map(|e| e.downcast_ref::<io::Error>()) {
        let reading = err.to_string().starts_with("Failed to read");
        return if reading || io_err.kind() == io::ErrorKind::NotFound {
            INPUT_ERROR
        } else {
            IO_ERROR
        };
    }

    GENERAL_ERROR
}
