//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use seai_core::service::VerifyResponse;
use seai_core::SealEngine;
use tracing::info;

use crate::exit_codes::Failure;
use crate::utils::{format_timestamp, read_image};

/// Execute the verify command.
///
/// Returns an error carrying the data-error exit code when the image holds no
/// valid seal.
pub fn execute(engine: &SealEngine, image: PathBuf, as_json: bool, quiet: bool) -> Result<()> {
    let content = read_image(&image)?;

    let result = engine
        .verify(&content)
        .with_context(|| format!("Failed to decode image: {}", image.display()))?;
    let response = VerifyResponse::from(&result);

    if result.is_verified() {
        info!(path = %image.display(), "Seal verified");
    } else {
        info!(path = %image.display(), reason = result.reason.as_str(), "Seal not verified");
    }

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialize result")?
        );
    } else if !quiet {
        print_human(&response);
    }

    if result.is_verified() {
        Ok(())
    } else {
        Err(Failure::not_verified(format!(
            "Verification failed: {}",
            result.reason.description()
        ))
        .into())
    }
}

fn print_human(response: &VerifyResponse) {
    println!();
    if response.verified {
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!(
            "{}",
            "║              VERIFIED                  ║".green().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".green());
        println!();
        println!("   {}", response.message.green());
        println!("   {}", response.details.dimmed());
        if let Some(generator) = &response.generator_id {
            println!("   {} {}", "Generator:".dimmed(), generator);
        }
        if let Some(timestamp) = response.timestamp {
            println!("   {} {}", "Sealed at:".dimmed(), format_timestamp(timestamp));
        }
        for (key, value) in response.metadata.iter().flatten() {
            println!("   {} {} = {}", "Metadata:".dimmed(), key, value);
        }
    } else {
        println!("{}", "╔════════════════════════════════════════╗".red());
        println!(
            "{}",
            "║            NOT VERIFIED                ║".red().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".red());
        println!();
        println!("   {}", response.message.red());
        println!("   {}", response.details.dimmed());
        println!("   {} {}", "Reason:".dimmed(), response.reason.as_str());
    }
}
