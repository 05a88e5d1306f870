//! CLI Command Definitions
//!
//! Clap argument structures for the granary allocation engine.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Granary - AI-assisted capital allocation and yield donation engine
#[derive(Parser, Debug)]
#[command(
    name = "granary",
    version = env!("CARGO_PKG_VERSION"),
    about = "Capital allocation and yield donation engine",
    long_about = "Granary pools deposited capital across yield-bearing venues, keeps \
                  investor principal separate from earned yield, and periodically \
                  donates the yield to a configured recipient."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the allocation service loop
    Run(RunCmd),

    /// Show pool status and per-venue allocation
    Status(StatusCmd),

    /// Execute a single rebalance toward the current targets
    Rebalance(RebalanceCmd),

    /// Attempt a yield release
    Release(ReleaseCmd),

    /// Fetch and display the current AI recommendation
    Recommend(RecommendCmd),
}

/// Start the allocation service
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Seed the pool with an initial deposit (base units)
    #[arg(long, value_name = "AMOUNT")]
    pub seed_deposit: Option<u64>,
}

/// Show pool status
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}

/// Run one rebalance
#[derive(Parser, Debug)]
pub struct RebalanceCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Target weights in basis points, comma separated (e.g. 4000,3000,2000,1000)
    #[arg(long, value_name = "BPS", value_delimiter = ',')]
    pub weights: Option<Vec<u16>>,
}

/// Attempt a yield release
#[derive(Parser, Debug)]
pub struct ReleaseCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}

/// Fetch the current recommendation
#[derive(Parser, Debug)]
pub struct RecommendCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}
