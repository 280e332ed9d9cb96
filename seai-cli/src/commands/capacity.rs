//! Capacity command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use seai_core::{CapacityPlanner, CarrierImage, SealConfig};

use crate::utils::read_image;

/// Execute the capacity command. Needs no master secret.
pub fn execute(image: PathBuf, as_json: bool, quiet: bool) -> Result<()> {
    let config = SealConfig::from_env();
    let content = read_image(&image)?;
    let carrier = CarrierImage::from_bytes(&content)
        .with_context(|| format!("Failed to decode image: {}", image.display()))?;

    let report = CapacityPlanner::from_config(&config).report(&carrier);

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!();
    println!("   {} {}", "Image:".dimmed(), image.display());
    println!(
        "   {} {}x{}, {} channel bytes per pixel",
        "Dimensions:".dimmed(),
        report.width,
        report.height,
        report.channels
    );
    println!(
        "   {} {} bits ({} bytes)",
        "Capacity:".dimmed(),
        report.capacity_bits,
        report.capacity_bits / 8
    );
    println!("   {} {} bytes", "Max tag size:".dimmed(), report.max_tag_bytes);
    if report.meets_min_dimension {
        println!("   {} {}", "Sealable:".dimmed(), "yes".green());
    } else {
        println!(
            "   {} {}",
            "Sealable:".dimmed(),
            format!(
                "no (minimum {}x{})",
                config.min_dimension, config.min_dimension
            )
            .red()
        );
    }

    Ok(())
}
