//! Info command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use seai_core::{service, SealConfig};

/// Execute the info command.
pub fn execute(as_json: bool) -> Result<()> {
    let info = service::info(&SealConfig::from_env());

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize info")?
        );
        return Ok(());
    }

    println!("{}", info.application.bold());
    println!();
    println!("   {} {}", "Version:".dimmed(), info.version);
    println!("   {} {}", "Encryption:".dimmed(), info.encryption);
    println!("   {} {}", "Key derivation:".dimmed(), info.key_derivation);
    println!("   {} {}", "Steganography:".dimmed(), info.steganography);
    println!(
        "   {} {}",
        "Formats:".dimmed(),
        info.supported_formats.join(", ").to_uppercase()
    );
    println!("   {} {} MB", "Max file size:".dimmed(), info.max_file_size_mb);

    Ok(())
}
