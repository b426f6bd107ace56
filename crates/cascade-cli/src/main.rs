//! Cascade CLI - Headless Player Runner and Source Diagnostics
//!
//! Features:
//! - Source selection and fallback-order planning
//! - Manifest probing (quality ladder, duration, liveness)
//! - Headless playback runs with failure routing

use clap::{Parser, Subcommand};

mod commands;
mod output;

/// Cascade CLI - Adaptive source player toolkit
#[derive(Parser)]
#[command(name = "cascade")]
#[command(version)]
#[command(about = "Adaptive video source diagnostics and headless playback", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the selection and fallback order for a source set
    Plan {
        /// HLS manifest URL
        #[arg(long)]
        hls: Option<String>,

        /// Embedded player URL
        #[arg(long)]
        embed: Option<String>,

        /// Direct file URL
        #[arg(long)]
        src: Option<String>,
    },

    /// Fetch and inspect an HLS manifest
    Probe {
        /// URL to the manifest
        manifest: String,

        /// Request timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },

    /// Run a headless playback session and stream its events
    Run {
        /// HLS manifest URL
        #[arg(long)]
        hls: Option<String>,

        /// Direct file URL
        #[arg(long)]
        src: Option<String>,

        /// Start position in seconds
        #[arg(short, long)]
        start: Option<f64>,

        /// Stop after this many seconds (0 = until ended or failed)
        #[arg(short, long, default_value = "0")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();

    match cli.command {
        Commands::Plan { hls, embed, src } => {
            commands::plan(hls, embed, src, &cli.format)?;
        }
        Commands::Probe { manifest, timeout } => {
            commands::probe(&manifest, timeout, &cli.format).await?;
        }
        Commands::Run {
            hls,
            src,
            start,
            timeout,
        } => {
            commands::run(hls, src, start, timeout, &cli.format).await?;
        }
    }

    Ok(())
}
