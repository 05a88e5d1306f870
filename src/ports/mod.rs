//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, these traits abstract:
//! - Strategy venues (deposit/withdraw/balance/rate)
//! - Asset payout for yield release
//!
//! The engine treats every venue identically through [`venue::VenuePort`];
//! it never branches on venue identity except to route calls.

pub mod mocks;
pub mod payout;
pub mod venue;

pub use payout::{PayoutError, PayoutPort};
pub use venue::{VenueError, VenuePort};
