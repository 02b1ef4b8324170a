//! Scull CLI
//!
//! Command-line tools for exercising an in-process scull device.
//!
//! # Commands
//!
//! - `resolve` - Show where an offset lands in the segment chain
//! - `load` - Load a file into a device, read it back and verify it
//! - `stress` - Run concurrent writers against a device
//! - `version` - Show version information

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scull_core::DeviceConfig;
use scull_storage::{DEFAULT_QSET_SIZE, DEFAULT_QUANTUM_SIZE};
use tracing_subscriber::EnvFilter;

use commands::OutputFormat;

/// Scull sparse memory device tools.
#[derive(Parser)]
#[command(name = "scull")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Bytes per quantum
    #[arg(global = true, long, default_value_t = DEFAULT_QUANTUM_SIZE)]
    quantum: usize,

    /// Quantum slots per segment
    #[arg(global = true, long, default_value_t = DEFAULT_QSET_SIZE)]
    qset: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the segment, slot and byte an offset resolves to
    Resolve {
        /// Device offset
        offset: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Load a file into a fresh device and verify the read-back
    Load {
        /// File to load
        file: PathBuf,

        /// Cap on bytes the device may allocate
        #[arg(short, long)]
        memory_limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Run concurrent writers over disjoint regions and verify the result
    Stress {
        /// Number of writer threads
        #[arg(short, long, default_value = "4")]
        threads: usize,

        /// Write calls per thread
        #[arg(short, long, default_value = "1000")]
        writes_per_thread: usize,

        /// Bytes offered per write call
        #[arg(short, long, default_value = "256")]
        chunk_size: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
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

    let config = DeviceConfig::new()
        .quantum_size(cli.quantum)
        .qset_size(cli.qset);

    match cli.command {
        Commands::Resolve { offset, format } => {
            commands::resolve::run(&config, offset, format)?;
        }
        Commands::Load {
            file,
            memory_limit,
            format,
        } => {
            let config = match memory_limit {
                Some(limit) => config.memory_limit(limit),
                None => config,
            };
            commands::load::run(config, &file, format)?;
        }
        Commands::Stress {
            threads,
            writes_per_thread,
            chunk_size,
            format,
        } => {
            commands::stress::run(config, threads, writes_per_thread, chunk_size, format)?;
        }
        Commands::Version => {
            println!("Scull CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Scull Core v{}", scull_core::VERSION);
        }
    }

    Ok(())
}
