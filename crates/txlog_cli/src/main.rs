//! txlog CLI
//!
//! Command-line tools for transaction log directories.
//!
//! # Commands
//!
//! - `inspect` - List segments with their sizes and headers
//! - `export` - Copy the log from a transaction onward into a directory

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use txlog_core::TransactionId;

/// Transaction log tools.
#[derive(Parser)]
#[command(name = "txlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the transaction log directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Segment file name prefix
    #[arg(global = true, long, default_value = "txlog")]
    prefix: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List segments with their sizes and headers
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Copy every segment from the one holding a transaction onward
    Export {
        /// First transaction to export
        #[arg(long)]
        from_tx: u64,

        /// Newest committed transaction, if known
        #[arg(long)]
        last_tx: Option<u64>,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
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
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Log path required for inspect")?;
            commands::inspect::run(&path, &cli.prefix, &format)?;
        }
        Commands::Export {
            from_tx,
            last_tx,
            out,
        } => {
            let path = cli.path.ok_or("Log path required for export")?;
            commands::export::run(
                &path,
                &cli.prefix,
                TransactionId::new(from_tx),
                last_tx.map(TransactionId::new),
                &out,
            )?;
        }
        Commands::Version => {
            println!("txlog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("txlog core v{}", txlog_core::VERSION);
        }
    }

    Ok(())
}
