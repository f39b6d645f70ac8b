//! CLI interface for stocklight
//!
//! Provides subcommands for:
//! - `run`: Watch a symbol and drive the indicator
//! - `quote`: One-shot market data snapshot
//! - `config`: Show the effective configuration

mod quote;
mod run;

pub use quote::QuoteArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stocklight")]
#[command(about = "Price watcher that drives an indicator light from price alerts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a symbol until interrupted
    Run(RunArgs),
    /// Print a market data snapshot as JSON
    Quote(QuoteArgs),
    /// Show configuration
    Config,
}
