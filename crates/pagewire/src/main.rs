//! Pagewire CLI - multi-page static HTML builder.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "pagewire")]
#[command(about = "Multi-page static HTML builder with shared partials")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to pagewire.toml config file
    #[arg(short, long, default_value = "pagewire.toml")]
    config: PathBuf,

    /// Build mode, selects .env.<mode> files
    #[arg(short, long)]
    mode: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new site in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Start development server with live reload
    Dev {
        /// Port to listen on
        #[arg(short, long, default_value = "5173")]
        port: u16,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Build the static site
    Build {
        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Minify stylesheets
        #[arg(long)]
        minify: bool,
    },

    /// Preview the built site
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4173")]
        port: u16,

        /// Directory to serve (defaults to the configured out_dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(yes).await?;
        }
        Commands::Dev { port, no_open } => {
            let mode = cli.mode.unwrap_or_else(|| "development".to_string());
            commands::dev::run(&cli.config, mode, port, !no_open).await?;
        }
        Commands::Build { out_dir, minify } => {
            let mode = cli.mode.unwrap_or_else(|| "production".to_string());
            let minify = if minify { Some(true) } else { None };
            commands::build::run(&cli.config, mode, out_dir, minify).await?;
        }
        Commands::Serve { port, dir } => {
            commands::serve::run(&cli.config, port, dir).await?;
        }
    }

    Ok(())
}
