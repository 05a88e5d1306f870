//! Venue Adapters
//!
//! In-process venue implementations. Production deployments plug real
//! protocol adapters in behind [`crate::ports::VenuePort`]; the simulated
//! venue backs paper runs and demos.

pub mod simulated;

pub use simulated::SimulatedVenue;
