//! Lumen CLI - chain image operations and inspect every intermediate result.
//!
//! # Usage
//!
//! ```bash
//! # Grayscale, then invert, then convert to JPEG
//! lumen run photo.png --step grayscale --step invert --step to_jpg
//!
//! # Same chain with the invert step deleted again, every image exported
//! lumen run photo.png -s grayscale -s invert -s to_jpg --remove 1 --save
//!
//! # List available operations
//! lumen ops
//!
//! # View configuration
//! lumen config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Lumen - chain image operations and inspect every intermediate result.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Load an image, apply a chain of operations and print the pipeline
    Run(cli::run::RunArgs),

    /// List the operation catalog
    Ops(cli::ops::OpsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match lumen_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `lumen config path`."
            );
            lumen_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Lumen v{}", lumen_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args).await,
        Commands::Ops(args) => cli::ops::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
