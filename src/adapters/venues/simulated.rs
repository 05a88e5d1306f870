//! Simulated Venue
//!
//! Deterministic in-process venue that accrues yield continuously at a
//! configured annual rate, with optional per-call jitter. Share pricing is
//! proportional, like a lending-protocol receipt token: accrual raises the
//! redeemable balance while the share count stays fixed.

use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::ports::venue::{VenueError, VenuePort};

const SECS_PER_YEAR: u64 = 31_536_000;

#[derive(Debug)]
struct SimState {
    balance: u64,
    shares: u64,
    last_accrual: Instant,
}

/// Paper-mode venue with continuous yield accrual.
#[derive(Debug)]
pub struct SimulatedVenue {
    name: String,
    annual_rate: Decimal,
    jitter: bool,
    state: Mutex<SimState>,
}

impl SimulatedVenue {
    pub fn new(name: impl Into<String>, annual_rate: Decimal) -> Self {
        Self {
            name: name.into(),
            annual_rate,
            jitter: false,
            state: Mutex::new(SimState {
                balance: 0,
                shares: 0,
                last_accrual: Instant::now(),
            }),
        }
    }

    /// Add up to +/-10% random noise to the reported yield rate.
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Credit yield directly, bypassing the clock. Test hook.
    pub fn force_accrue(&self, amount: u64) {
        self.state.lock().unwrap().balance += amount;
    }

    fn accrue(&self, state: &mut SimState) {
        let elapsed_secs = state.last_accrual.elapsed().as_secs();
        if elapsed_secs == 0 || state.balance == 0 {
            return;
        }
        let growth = Decimal::from(state.balance) * self.annual_rate
            * Decimal::from(elapsed_secs)
            / Decimal::from(SECS_PER_YEAR);
        let earned = growth.floor().to_u64().unwrap_or(0);
        if earned > 0 {
            state.balance += earned;
            state.last_accrual = Instant::now();
            tracing::trace!(venue = self.name, earned, "simulated yield accrued");
        }
    }
}

#[async_trait]
impl VenuePort for SimulatedVenue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deposit(&self, amount: u64) -> Result<u64, VenueError> {
        let mut state = self.state.lock().unwrap();
        self.accrue(&mut state);
        let minted = if state.shares == 0 || state.balance == 0 {
            amount
        } else {
            (amount as u128 * state.shares as u128 / state.balance as u128) as u64
        };
        state.balance += amount;
        state.shares += minted;
        Ok(minted)
    }

    async fn withdraw(&self, shares: u64) -> Result<u64, VenueError> {
        let mut state = self.state.lock().unwrap();
        self.accrue(&mut state);
        if shares > state.shares {
            return Err(VenueError::InsufficientShares {
                requested: shares,
                available: state.shares,
            });
        }
        let amount = if state.shares == 0 {
            0
        } else {
            (shares as u128 * state.balance as u128 / state.shares as u128) as u64
        };
        state.shares -= shares;
        state.balance -= amount;
        Ok(amount)
    }

    async fn balance(&self) -> Result<u64, VenueError> {
        let mut state = self.state.lock().unwrap();
        self.accrue(&mut state);
        Ok(state.balance)
    }

    async fn yield_rate(&self) -> Result<Decimal, VenueError> {
        if self.jitter {
            let noise: f64 = rand::thread_rng().gen_range(-0.1..=0.1);
            let factor = Decimal::from_f64_retain(1.0 + noise).unwrap_or(Decimal::ONE);
            Ok(self.annual_rate * factor)
        } else {
            Ok(self.annual_rate)
        }
    }
}
