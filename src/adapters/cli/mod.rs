//! CLI Adapter
//!
//! Command-line interface definitions for the granary binary.

pub mod commands;

pub use commands::{CliApp, Command, RebalanceCmd, RecommendCmd, ReleaseCmd, RunCmd, StatusCmd};
