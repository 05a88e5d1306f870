//! Recording mocks for the venue and payout ports.
//!
//! `MockVenue` models a single-depositor venue with proportional share
//! pricing: yield accrual raises the redeemable balance without minting
//! shares, so the share price climbs exactly like a real lending position.
//! Both mocks record calls and support failure injection.

use crate::domain::AccountId;
use crate::ports::payout::{PayoutError, PayoutPort};
use crate::ports::venue::{VenueError, VenuePort};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct MockVenueState {
    balance: u64,
    shares: u64,
    rate: Decimal,
    fail_deposits: bool,
    fail_withdrawals: bool,
    calls: Vec<String>,
}

/// In-memory venue with controllable yield and failure behavior.
#[derive(Debug)]
pub struct MockVenue {
    name: String,
    state: Mutex<MockVenueState>,
}

impl MockVenue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MockVenueState::default()),
        }
    }

    pub fn with_rate(self, rate: Decimal) -> Self {
        self.state.lock().unwrap().rate = rate;
        self
    }

    /// Simulate yield: redeemable balance grows, share count does not.
    pub fn accrue(&self, amount: u64) {
        self.state.lock().unwrap().balance += amount;
    }

    pub fn set_fail_deposits(&self, fail: bool) {
        self.state.lock().unwrap().fail_deposits = fail;
    }

    pub fn set_fail_withdrawals(&self, fail: bool) {
        self.state.lock().unwrap().fail_withdrawals = fail;
    }

    pub fn balance_now(&self) -> u64 {
        self.state.lock().unwrap().balance
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl VenuePort for MockVenue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deposit(&self, amount: u64) -> Result<u64, VenueError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("deposit({amount})"));
        if state.fail_deposits {
            return Err(VenueError::TransferFailed(format!(
                "{}: injected deposit failure",
                self.name
            )));
        }
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
        state.calls.push(format!("withdraw({shares})"));
        if state.fail_withdrawals {
            return Err(VenueError::TransferFailed(format!(
                "{}: injected withdraw failure",
                self.name
            )));
        }
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
        Ok(self.state.lock().unwrap().balance)
    }

    async fn yield_rate(&self) -> Result<Decimal, VenueError> {
        Ok(self.state.lock().unwrap().rate)
    }
}

/// Payout sink that credits an in-memory balance per recipient.
#[derive(Debug, Default)]
pub struct MockPayout {
    balances: Mutex<HashMap<AccountId, u64>>,
    fail: Mutex<bool>,
}

impl MockPayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn balance_of(&self, account: &AccountId) -> u64 {
        self.balances
            .lock()
            .unwrap()
            .get(account)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PayoutPort for MockPayout {
    async fn transfer(&self, to: &AccountId, amount: u64) -> Result<(), PayoutError> {
        if *self.fail.lock().unwrap() {
            return Err(PayoutError::TransferFailed(
                "injected payout failure".to_string(),
            ));
        }
        *self.balances.lock().unwrap().entry(to.clone()).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_venue_share_pricing() {
        let venue = MockVenue::new("aave").with_rate(dec!(0.05));

        let shares = venue.deposit(1000).await.unwrap();
        assert_eq!(shares, 1000);
        assert_eq!(venue.balance().await.unwrap(), 1000);

        // Yield accrues: same shares, more value.
        venue.accrue(100);
        assert_eq!(venue.balance().await.unwrap(), 1100);
        assert_eq!(venue.withdraw(1000).await.unwrap(), 1100);
        assert_eq!(venue.balance().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mock_venue_failure_injection() {
        let venue = MockVenue::new("spark");
        venue.set_fail_deposits(true);
        assert!(matches!(
            venue.deposit(10).await,
            Err(VenueError::TransferFailed(_))
        ));
        assert_eq!(venue.calls(), vec!["deposit(10)".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_venue_over_redemption() {
        let venue = MockVenue::new("morpho");
        venue.deposit(10).await.unwrap();
        assert_eq!(
            venue.withdraw(11).await.unwrap_err(),
            VenueError::InsufficientShares {
                requested: 11,
                available: 10
            }
        );
    }

    #[tokio::test]
    async fn test_mock_payout_credits_recipient() {
        let payout = MockPayout::new();
        let charity = AccountId::from("charity");
        payout.transfer(&charity, 10).await.unwrap();
        payout.transfer(&charity, 5).await.unwrap();
        assert_eq!(payout.balance_of(&charity), 15);

        payout.set_fail(true);
        assert!(payout.transfer(&charity, 1).await.is_err());
        assert_eq!(payout.balance_of(&charity), 15);
    }
}
