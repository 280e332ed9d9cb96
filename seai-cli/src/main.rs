//! SeAI CLI - hide and verify AI-provenance seals in images.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use seai_core::crypto::keys::DEFAULT_MASTER_KEY_LEN;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitStatus;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (for verify: the seal is authentic)
  1   General error
  64  Invalid arguments
  65  Seal not verified, or image too small / undecodable
  66  Input file not found or unreadable
  74  Output file could not be written
  78  Configuration error (e.g. SEAL_MASTER_KEY not set)";

#[derive(Parser)]
#[command(name = "seai")]
#[command(author, version, about = "Hide and verify AI-provenance seals in images", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Master secret used to derive per-image keys
    #[arg(long, global = true, env = "SEAL_MASTER_KEY", hide_env_values = true)]
    secret: Option<String>,

    /// Suppress all output except errors and requested data
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed an encrypted SeAl tag into an image
    Embed {
        /// Image to seal (PNG, JPEG or BMP)
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Output path (defaults to <IMAGE stem>_sealed.png)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Metadata entry recorded in the tag (repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = utils::parse_key_val)]
        metadata: Vec<(String, String)>,

        /// Generator identifier (overrides SEAL_GENERATOR_ID)
        #[arg(long, value_name = "ID")]
        generator: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether an image carries a valid SeAl tag
    Verify {
        /// Image to verify
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how much tag data an image can carry
    Capacity {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a new random master key
    Keygen {
        /// Key length in characters (minimum 32)
        #[arg(short, long, default_value_t = DEFAULT_MASTER_KEY_LEN)]
        length: usize,

        /// Write SEAL_MASTER_KEY into this dotenv file instead of printing it
        #[arg(long, value_name = "PATH")]
        write_env: Option<PathBuf>,
    },

    /// Show algorithms, supported formats and limits
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("seai_core=debug,seai=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    let secret = cli.secret.as_deref();

    match cli.command {
        Commands::Embed {
            image,
            output,
            metadata,
            generator,
            json,
        } => {
            let engine = utils::build_engine(secret, generator)?;
            commands::embed::execute(&engine, image, output, metadata, json, quiet)
        }
        Commands::Verify { image, json } => {
            let engine = utils::build_engine(secret, None)?;
            commands::verify::execute(&engine, image, json, quiet)
        }
        Commands::Capacity { image, json } => commands::capacity::execute(image, json, quiet),
        Commands::Keygen { length, write_env } => {
            commands::keygen::execute(length, write_env, quiet)
        }
        Commands::Info { json } => commands::info::execute(json),
    }
}

fn main() -> ExitCode {
    // Variables already set in the environment take precedence over .env.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Ignoring unreadable .env file"),
    }

    let status = match run(cli) {
        Ok(()) => ExitStatus::success(),
        Err(err) => ExitStatus::from_anyhow(&err),
    };

    if let Some(message) = &status.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    ExitCode::from(status.code)
}
