//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits and external
//! clients:
//! - Recommender: HTTP client for the AI allocation service
//! - Venues: simulated yield-bearing venues for paper runs
//! - Payout: local payout sink
//! - CLI: command-line interface definitions

pub mod cli;
pub mod payout;
pub mod recommender;
pub mod venues;

pub use cli::CliApp;
pub use payout::LocalPayout;
pub use recommender::RecommenderClient;
pub use venues::SimulatedVenue;
