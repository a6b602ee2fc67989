//! bvgraph CLI - Inspection tool for BVGraph compressed graphs.
//!
//! Reads the `<basename>.properties`, `.graph` and `.offsets` triple written
//! by WebGraph and reports on it: metadata, degree statistics, integrity,
//! and the arcs themselves.

mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// BVGraph inspection tool.
///
/// Every command takes the graph basename, i.e. the path without the
/// `.graph` / `.properties` / `.offsets` suffix.
#[derive(Parser)]
#[command(name = "bvgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Suppress progress and info messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table format (default for TTY)
    #[default]
    Table,
    /// Machine-readable JSON format
    Json,
}

/// How `print` holds the graph while streaming it.
#[derive(Clone, Copy, ValueEnum, Default)]
enum StreamMode {
    /// Read the graph into memory
    #[default]
    Memory,
    /// Memory-map the graph file
    Mapped,
    /// Stream from disk through a small buffer
    Disk,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Display graph metadata (counts, codes, sizes, memory estimate)
    Info {
        /// Graph basename
        path: PathBuf,
    },

    /// Compute outdegree statistics with a parallel scan
    Stats {
        /// Graph basename
        path: PathBuf,

        /// Worker threads (defaults to one per core)
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Decode every list and cross-check it against the metadata
    Validate {
        /// Graph basename
        path: PathBuf,

        /// Compare every N-th list with a random-access decode (0 disables)
        #[arg(long, default_value_t = 1024)]
        sample_stride: u64,
    },

    /// Print every arc as `source -> target`
    Print {
        /// Graph basename
        path: PathBuf,

        /// Where the bitstream is held while printing
        #[arg(long, default_value = "memory")]
        mode: StreamMode,
    },

    /// Print the successors of one or more nodes
    Successors {
        /// Graph basename
        path: PathBuf,

        /// Node ids
        #[arg(required = true)]
        nodes: Vec<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Info { path } => commands::info::run(&path, cli.format, cli.quiet),
        Commands::Stats { path, threads } => {
            commands::stats::run(&path, threads, cli.format, cli.quiet)
        }
        Commands::Validate {
            path,
            sample_stride,
        } => commands::validate::run(&path, sample_stride, cli.format, cli.quiet),
        Commands::Print { path, mode } => commands::print::run(&path, mode, cli.format),
        Commands::Successors { path, nodes } => {
            commands::successors::run(&path, &nodes, cli.format, cli.quiet)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
