//! Grocer Sync CLI
//!
//! Command-line tools for running and inspecting state reconciliation.
//!
//! # Commands
//!
//! - `sync` - Run one full sync pass between a local state file and a
//!   remote state file served over a loopback gateway
//! - `inspect` - Display timestamps and checksums stored in a state file

mod commands;

use clap::{Parser, Subcommand};
use grocer_sync_engine::{BASE_DELAY, MAX_RETRIES};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Grocer state sync tools.
#[derive(Parser)]
#[command(name = "grocer-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full sync pass
    Sync {
        /// Local state file (created if missing)
        #[arg(short, long)]
        local: PathBuf,

        /// Remote state file served by the loopback server
        #[arg(short, long)]
        remote: PathBuf,

        /// Simulate an offline device
        #[arg(long)]
        offline: bool,

        /// Attempts per network call
        #[arg(long, default_value_t = MAX_RETRIES)]
        max_retries: u32,

        /// Delay before the first retry, in milliseconds
        #[arg(long, default_value_t = BASE_DELAY.as_millis() as u64)]
        base_delay_ms: u64,

        /// Reconcile entities on parallel threads
        #[arg(long)]
        concurrent: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display timestamps and checksums stored in a state file
    Inspect {
        /// State file to inspect
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sync {
            local,
            remote,
            offline,
            max_retries,
            base_delay_ms,
            concurrent,
            format,
        } => {
            let options = commands::sync::SyncOptions {
                local,
                remote,
                offline,
                max_retries,
                base_delay_ms,
                concurrent,
            };
            commands::sync::run(&options, &format)?;
        }
        Commands::Inspect { file, format } => {
            commands::inspect::run(&file, &format)?;
        }
        Commands::Version => {
            println!("grocer-sync v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
