//! Keygen command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use seai_core::crypto::keys::MIN_MASTER_KEY_LEN;
use seai_core::{fingerprint, generate_master_key};
use tracing::info;

use crate::exit_codes::Failure;
use crate::utils::{merge_env_file, MASTER_KEY_VAR};

/// Execute the keygen command.
///
/// Prints the key unless it is written to an env file.
pub fn execute(length: usize, write_env: Option<PathBuf>, quiet: bool) -> Result<()> {
    if length < MIN_MASTER_KEY_LEN {
        return Err(Failure::usage(format!(
            "Key length must be at least {} characters (got {})",
            MIN_MASTER_KEY_LEN, length
        ))
        .into());
    }

    let key = generate_master_key(length).context("Failed to generate master key")?;
    let key_fingerprint = fingerprint(key.as_bytes());

    match write_env {
        Some(path) => {
            merge_env_file(&path, MASTER_KEY_VAR, &key)?;
            info!(path = %path.display(), fingerprint = %&key_fingerprint[..16], "Master key written");

            if !quiet {
                println!("{}", "New master key generated".green().bold());
                println!();
                println!(
                    "   {} {} in {}",
                    "Written:".dimmed(),
                    MASTER_KEY_VAR,
                    path.display()
                );
                println!("   {} {}", "Fingerprint:".dimmed(), key_fingerprint);
                println!();
                println!(
                    "{}",
                    "Keep this file secret; images sealed with this key verify only with it."
                        .yellow()
                );
            }
        }
        None => {
            if quiet {
                println!("{}", key.as_str());
            } else {
                println!("{}", "New master key generated".green().bold());
                println!();
                println!("   {}={}", MASTER_KEY_VAR, key.as_str());
                println!("   {} {}", "Fingerprint:".dimmed(), key_fingerprint);
            }
        }
    }

    Ok(())
}
