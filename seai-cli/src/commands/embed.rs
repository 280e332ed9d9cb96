//! Embed command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use seai_core::SealEngine;
use serde_json::json;
use tracing::{debug, info};

use crate::utils::{default_output_path, read_image};

/// Execute the embed command.
pub fn execute(
    engine: &SealEngine,
    image: PathBuf,
    output: Option<PathBuf>,
    metadata: Vec<(String, String)>,
    as_json: bool,
    quiet: bool,
) -> Result<()> {
    let content = read_image(&image)?;
    let output = output.unwrap_or_else(|| default_output_path(&image));

    let tag = engine
        .tag_builder()
        .extend_metadata(metadata)
        .metadata("original_filename", file_name(&image))
        .build()
        .context("Failed to build seal tag")?;
    debug!(entries = tag.metadata().len(), "Built seal tag");

    let sealed = engine
        .embed(&content, &tag)
        .with_context(|| format!("Failed to seal image: {}", image.display()))?;

    std::fs::write(&output, &sealed.png)
        .with_context(|| format!("Failed to write sealed image: {}", output.display()))?;
    info!(path = %output.display(), bytes = sealed.png.len(), "Sealed image saved");

    if as_json {
        let report = json!({
            "success": true,
            "message": "SeAl tag successfully embedded",
            "output": output.display().to_string(),
            "width": sealed.width,
            "height": sealed.height,
            "payload_bits": sealed.payload_bits,
            "capacity_bits": sealed.capacity_bits,
            "generator_id": tag.generator_id(),
            "timestamp": tag.timestamp(),
            "metadata": tag.metadata(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else if !quiet {
        let usage = sealed.payload_bits as f64 / sealed.capacity_bits.max(1) as f64 * 100.0;

        println!();
        println!("{}", "SeAl tag successfully embedded".green().bold());
        println!();
        println!("   {} {}", "Sealed image:".dimmed(), output.display());
        println!(
            "   {} {}x{}",
            "Dimensions:".dimmed(),
            sealed.width,
            sealed.height
        );
        println!(
            "   {} {} of {} bits ({:.2}%)",
            "Payload:".dimmed(),
            sealed.payload_bits,
            sealed.capacity_bits,
            usage
        );
        println!("   {} {}", "Generator:".dimmed(), tag.generator_id());
        for (key, value) in tag.metadata() {
            println!("   {} {} = {}", "Metadata:".dimmed(), key, value);
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
