//! Engine configuration.
//!
//! Loaded once at startup (usually from environment variables) and passed
//! into [`SealEngine::new`](crate::SealEngine::new). Never mutated afterwards.

use std::str::FromStr;

use serde::Serialize;

use tracing::warn;

use crate::crypto::kdf::MIN_ITERATIONS;
use crate::error::{Result, SealError};

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Default minimum width and height of a carrier image, in pixels.
pub const DEFAULT_MIN_DIMENSION: u32 = 100;

/// Default generator identifier written into new tags.
pub const DEFAULT_GENERATOR_ID: &str = "SeAl:AI-GENERATED";

/// Default maximum accepted upload size in bytes (16 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Which channel bytes of each pixel carry payload bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSelection {
    /// R, G and B only. Alpha is never touched.
    #[default]
    ColorOnly,
    /// Every channel, alpha included when present.
    All,
}

impl ChannelSelection {
    /// Number of channel bytes used per pixel for an image with `channels` samples per pixel.
    pub fn used_per_pixel(&self, channels: u8) -> u8 {
        match self {
            ChannelSelection::ColorOnly => channels.min(3),
            ChannelSelection::All => channels,
        }
    }
}

impl FromStr for ChannelSelection {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rgb" | "color" => Ok(ChannelSelection::ColorOnly),
            "all" | "rgba" => Ok(ChannelSelection::All),
            other => Err(SealError::Config(format!(
                "unknown channel selection '{}' (expected 'rgb' or 'all')",
                other
            ))),
        }
    }
}

/// Engine configuration knobs.
#[derive(Debug, Clone)]
pub struct SealConfig {
    /// PBKDF2-HMAC-SHA256 iteration count (default: 100 000, never lower)
    pub pbkdf2_iterations: u32,
    /// Minimum carrier width and height in pixels (default: 100)
    pub min_dimension: u32,
    /// Channels used for embedding (default: color channels only)
    pub channels: ChannelSelection,
    /// Generator identifier recorded in new tags
    pub generator_id: String,
    /// Maximum upload size accepted by the service layer (default: 16 MB)
    pub max_upload_bytes: usize,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: DEFAULT_ITERATIONS,
            min_dimension: DEFAULT_MIN_DIMENSION,
            channels: ChannelSelection::default(),
            generator_id: DEFAULT_GENERATOR_ID.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl SealConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Unparseable values fall back to the default too (with a warning);
    /// [`validate`](Self::validate) is what rejects weak settings.
    pub fn from_env() -> Self {
        Self::from_source(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with variables read through `get`.
    pub fn from_source<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let pbkdf2_iterations =
            parse_var(&get, "SEAL_PBKDF2_ITERATIONS").unwrap_or(defaults.pbkdf2_iterations);
        let min_dimension =
            parse_var(&get, "SEAL_MIN_DIMENSION").unwrap_or(defaults.min_dimension);
        let channels = parse_var(&get, "SEAL_CHANNELS").unwrap_or(defaults.channels);

        let generator_id = get("SEAL_GENERATOR_ID")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.generator_id);

        let max_upload_bytes = parse_var::<usize, _>(&get, "SEAL_MAX_FILE_SIZE_MB")
            .and_then(|mb| {
                let bytes = mb.checked_mul(1024 * 1024);
                if bytes.is_none() {
                    warn!(value = mb, "SEAL_MAX_FILE_SIZE_MB overflows, using default");
                }
                bytes
            })
            .unwrap_or(defaults.max_upload_bytes);

        Self {
            pbkdf2_iterations,
            min_dimension,
            channels,
            generator_id,
            max_upload_bytes,
        }
    }

    /// Reject configurations that would silently weaken the seal.
    pub fn validate(&self) -> Result<()> {
        if self.pbkdf2_iterations < MIN_ITERATIONS {
            return Err(SealError::Config(format!(
                "PBKDF2 iteration count {} is below the minimum of {}",
                self.pbkdf2_iterations, MIN_ITERATIONS
            )));
        }
        if self.min_dimension == 0 {
            return Err(SealError::Config(
                "minimum image dimension must be at least 1".into(),
            ));
        }
        if self.generator_id.is_empty() {
            return Err(SealError::Config("generator id must not be empty".into()));
        }
        if self.generator_id.len() > u16::MAX as usize {
            return Err(SealError::Config("generator id is too long".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(SealError::Config("upload size limit must be positive".into()));
        }
        Ok(())
    }
}

/// Parse a set variable, warning when its value is not understood.
fn parse_var<T, F>(get: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = get(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "unparseable value, using default");
            None
        }
    }
}
