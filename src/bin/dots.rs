//! Dots and boxes simulator CLI
//!
//! - `play`: run matches between learning and baseline policies
//! - `inspect`: summarise a saved value table

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dots")]
#[command(version, about = "Dots and boxes simulator with Q-learning agents", long_about = None)]
struct Cli {
    /// Log filter (e.g. debug, or dotsnboxes=trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run matches between policies
    Play(Box<dotsnboxes::cli::commands::play::PlayArgs>),

    /// Summarise a saved value table
    Inspect(dotsnboxes::cli::commands::inspect::InspectArgs),
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Play(args) => dotsnboxes::cli::commands::play::execute(*args),
        Commands::Inspect(args) => dotsnboxes::cli::commands::inspect::execute(args),
    }
}
