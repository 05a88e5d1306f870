//! Domain Layer - Core accounting and allocation logic for the Granary engine
//!
//! This module contains pure domain types and logic with no external dependencies.
//! All venue and payout interactions happen through the ports layer.
//!
//! ## Modules
//!
//! - `ledger`: principal/yield accounting and rate-limited yield release
//! - `validator`: structural weight checks and the post-rebalance health hook
//! - `controller`: target weights, drift limiting, and rebalance planning
//! - `auth`: caller identities and the admin capability check
//! - `events`: state-change notifications for observability

pub mod auth;
pub mod controller;
pub mod events;
pub mod ledger;
pub mod validator;

pub use auth::{AccountId, AuthError, AuthPolicy};
pub use controller::{
    AllocationController, AllocationPolicy, AllocationStatus, ControllerError, VenueAllocation,
    VenueMove,
};
pub use events::{EngineEvent, EventLog};
pub use ledger::{AccountingLedger, LedgerError};
pub use validator::{
    validate_weights, DefaultHealthCheck, HealthCheck, HealthReport, ValidationError, WeightPolicy,
    WHOLE_BPS,
};
