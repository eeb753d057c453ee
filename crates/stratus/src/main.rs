//! Stratus - browser-facing cloud console gateway
//!
//! Main entry point for the Stratus server binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Stratus - browser-facing cloud console gateway
#[derive(Parser)]
#[command(name = "stratus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long, global = true, env = "STRATUS_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the console server
    Serve(serve::ServeArgs),

    /// Validate and print the effective configuration
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "stratus=debug,stratus_server=debug,stratus_oauth=debug,stratus_session=debug,tower_http=debug,info"
    } else {
        "stratus=info,stratus_server=info,stratus_oauth=info,stratus_session=info,warn"
    };

    use tracing_subscriber::prelude::*;
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(tracing_subscriber::EnvFilter::new(filter));

    // The guard flushes the file writer on drop, so it lives until main returns.
    let (file_layer, _guard) = match &cli.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "stratus.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "stratus=trace,stratus_server=trace,stratus_oauth=trace,stratus_session=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Config(args) => config::run(args),
    }
}
