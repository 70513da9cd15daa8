//! Cvg CLI - reward accounting engine tools
//!
//! Inspect the inflation schedule and replay protocol scenarios through the engine.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Cvg: vote-escrow locking, gauge voting and chunked reward distribution
///
/// Every command runs the deterministic engine in-process; nothing touches a chain.
#[derive(Parser)]
#[command(name = "cvg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine config file (JSON)
    #[arg(short, long, global = true, env = "CVG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the staking inflation schedule
    Inflation {
        /// First cycle
        #[arg(long, default_value_t = 1)]
        from: u64,

        /// Last cycle (inclusive)
        #[arg(long, default_value_t = 1100)]
        to: u64,

        /// Cycles between two printed rows
        #[arg(long, default_value_t = 105)]
        step: u64,

        /// Inflation ratio in bps (defaults to the configured ratio)
        #[arg(long)]
        ratio: Option<u16>,

        /// Output format (json, human)
        #[arg(short, long, default_value = "human")]
        format: String,
    },

    /// Replay a scenario file through the engine
    Simulate {
        /// Scenario file (JSON)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Output format (json, human)
        #[arg(short, long, default_value = "human")]
        format: String,
    },

    /// Print the effective engine configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    // Initialize logging
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inflation {
            from,
            to,
            step,
            ratio,
            format,
        } => commands::inflation::run(from, to, step, ratio, &format, &config),
        Commands::Simulate { scenario, format } => {
            commands::simulate::run(&scenario, &format, config)
        }
        Commands::Config => commands::config::run(&config),
    }
}
