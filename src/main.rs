use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gensync::{ApiClient, Config, ProjectFilter, SyncEngine, SyncOptions, SyncSummary};

#[derive(Parser)]
#[command(name = "gensync")]
#[command(about = "Keep generated source code in sync with a code generation service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to .gensync.yml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch generated code and rewrite files that changed
    Update {
        /// Only update projects of this organization
        #[arg(long)]
        org: Option<String>,

        /// Only update this application
        #[arg(long)]
        app: Option<String>,

        /// Report what would change without writing files
        #[arg(long)]
        dry_run: bool,
    },

    /// Report which generated files are out of date, exiting 1 if any are
    Check {
        /// Only check projects of this organization
        #[arg(long)]
        org: Option<String>,

        /// Only check this application
        #[arg(long)]
        app: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting gensync v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Update { org, app, dry_run } => {
            cmd_update(config, ProjectFilter { org, app }, dry_run).await
        }
        Commands::Check { org, app } => cmd_check(config, ProjectFilter { org, app }).await,
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries the status report, logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => PathBuf::from(shellexpand::full(&path.to_string_lossy())?.into_owned()),
        None => Config::default_config_path(),
    };

    Config::load(&path)
}

async fn run_engine(config: Config, options: SyncOptions) -> Result<SyncSummary> {
    let client = ApiClient::new(&config.settings)?;
    let engine = SyncEngine::new(config, Box::new(client));

    engine.run(&options, &mut |line| println!("{}", line)).await
}

/// Plan and apply updates for every configured target
async fn cmd_update(config: Config, filter: ProjectFilter, dry_run: bool) -> Result<()> {
    let summary = run_engine(config, SyncOptions { dry_run, filter }).await?;

    if !summary.is_success() {
        eprintln!();
        eprintln!("Failed to write {} file(s):", summary.failures.len());
        for failure in &summary.failures {
            eprintln!("  - {}: {}", failure, failure.source);
        }
        bail!("{} of {} update(s) failed", summary.failures.len(), summary.updates.len());
    }

    Ok(())
}

/// Preview updates without writing; out-of-date files give exit status 1
async fn cmd_check(config: Config, filter: ProjectFilter) -> Result<()> {
    let options = SyncOptions {
        dry_run: true,
        filter,
    };
    let summary = run_engine(config, options).await?;

    if !summary.updates.is_empty() {
        eprintln!("{} generated file(s) out of date", summary.updates.len());
        std::process::exit(1);
    }

    Ok(())
}
