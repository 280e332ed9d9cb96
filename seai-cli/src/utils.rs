//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use seai_core::{MasterSecret, SealConfig, SealEngine, SealError};
use tracing::debug;

/// Environment variable holding the master secret.
pub const MASTER_KEY_VAR: &str = "SEAL_MASTER_KEY";

/// Build the default sealed output path from the input path.
///
/// Transforms `dir/photo.jpg` into `dir/photo_sealed.png`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{}_sealed.png", stem))
}

/// Parse a `KEY=VALUE` metadata argument.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Read an input image from disk.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read image");
    Ok(bytes)
}

/// Build an engine from environment configuration and the given secret.
pub fn build_engine(secret: Option<&str>, generator: Option<String>) -> Result<SealEngine> {
    let mut config = SealConfig::from_env();
    if let Some(generator) = generator {
        config.generator_id = generator;
    }

    let secret = secret.ok_or_else(|| {
        SealError::Config(format!(
            "{} is not set; pass --secret or set the environment variable",
            MASTER_KEY_VAR
        ))
    })?;
    let secret = MasterSecret::new(secret)?;

    Ok(SealEngine::new(config, secret)?)
}

/// Format a Unix timestamp (seconds) as a human-readable UTC string.
pub fn format_timestamp(timestamp_secs: u64) -> String {
    match Utc.timestamp_opt(timestamp_secs as i64, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{}s", timestamp_secs),
    }
}

/// Set `key=value` in a dotenv-style file, keeping every other line.
///
/// Replaces an existing assignment of `key` in place or appends one.
pub fn merge_env_file(path: &Path, key: &str, value: &str) -> Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read env file: {}", path.display()))
        }
    };

    let merged = merge_env_content(&existing, key, value);
    std::fs::write(path, merged)
        .with_context(|| format!("Failed to write env file: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Single-quote `value` unless it is plain, so `.env` loaders read it back verbatim.
fn quote_env_value(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '+'));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

fn merge_env_content(existing: &str, key: &str, value: &str) -> String {
    let assignment = format!("{}={}", key, quote_env_value(value));
    let mut replaced = false;

    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            let name = line
                .trim_start()
                .trim_start_matches("export ")
                .split('=')
                .next()
                .unwrap_or_default()
                .trim();
            if name == key && line.contains('=') && !replaced {
                replaced = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        lines.push(assignment);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
