//! CLI tool for inspecting serialized write batches.
//!
//! Provides commands for:
//! - Dumping every record of a batch file
//! - Verifying a batch decodes cleanly and its count matches
//! - Looking a key up against the queued records

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the batch tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with batch configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the header and every record of a batch file
    Dump {
        /// Serialized batch, header included
        file: PathBuf,

        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Check that a batch file decodes and its header count is right
    Verify {
        /// Serialized batch, header included
        file: PathBuf,
    },

    /// Resolve a key against the records queued in a batch file
    Get {
        /// Serialized batch, header included
        file: PathBuf,

        /// Key to look up
        #[arg(short, long)]
        key: String,

        /// Column family id
        #[arg(long, default_value_t = 0)]
        cf: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    let mut out = io::stdout().lock();
    match cli.command {
        Commands::Dump { file, json } => commands::dump(&file, &config, json, &mut out),
        Commands::Verify { file } => commands::verify(&file, &config, &mut out),
        Commands::Get { file, key, cf } => {
            commands::get(&file, &config, cf, key.as_bytes(), &mut out)
        }
    }
}
