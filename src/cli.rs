//! Command-line surface (§4.11): `run`, `init-db`, `status`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pairkeeper")]
#[command(version, about = "Paired YES/NO market maker for short-dated binary event contracts.")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the engine loop.
    Run(RunArgs),
    /// Apply pending Diesel migrations against the configured database and exit.
    InitDb,
    /// Reload the ledger image and print open pairs, PnL summary, and recent events.
    Status,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Force paper trading regardless of the config file.
    #[arg(long, conflicts_with = "live")]
    pub paper: bool,
    /// Force live trading regardless of the config file.
    #[arg(long, conflicts_with = "paper")]
    pub live: bool,
}
