//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cyclearb - multi-venue loop arbitrage and cross-venue fishing.
#[derive(Parser, Debug)]
#[command(name = "cyclearb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Evaluate loops without placing loop orders
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the engine until Ctrl-C (default)
    Run,
    /// Validate the configuration file and exit
    Check,
}

impl Cli {
    #[must_use]
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}
