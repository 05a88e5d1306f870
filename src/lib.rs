//! Granary - Capital Allocation & Yield Donation Engine Library
//!
//! Pools deposited capital across a fixed set of yield-bearing venues,
//! tracks investor principal separately from earned yield, and releases the
//! yield to a configured recipient under rate-limited, validated conditions.
//!
//! # Modules
//!
//! - `domain`: Core business logic (Ledger, Controller, Validator, Events)
//! - `ports`: Trait abstractions (VenuePort, PayoutPort)
//! - `adapters`: External implementations (Recommender, SimulatedVenue, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Allocation engine and service loop

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
