//! Venue Port
//!
//! Uniform capability implemented per strategy venue. The engine never
//! assumes a particular share-pricing model beyond "shares redeem to a
//! monotonically non-decreasing amount absent losses".

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VenueError {
    #[error("venue unavailable: {0}")]
    Unavailable(String),

    #[error("asset transfer failed: {0}")]
    TransferFailed(String),

    #[error("redeeming {requested} shares exceeds held {available}")]
    InsufficientShares { requested: u64, available: u64 },
}

/// Narrow contract every yield-bearing venue exposes.
///
/// Amounts are integer base units of the underlying asset; shares are the
/// venue's own accounting units and only meaningful to that venue.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VenuePort: Send + Sync {
    /// Stable display name, also used to match recommendation entries.
    fn name(&self) -> &str;

    /// Move `amount` of the asset into the venue; returns shares minted.
    async fn deposit(&self, amount: u64) -> Result<u64, VenueError>;

    /// Redeem `shares`; returns the asset amount received.
    async fn withdraw(&self, shares: u64) -> Result<u64, VenueError>;

    /// Current redeemable value of all shares held by the caller.
    async fn balance(&self) -> Result<u64, VenueError>;

    /// Current yield rate as an annualized fraction (e.g. 0.072 = 7.2%).
    async fn yield_rate(&self) -> Result<Decimal, VenueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_contract_via_mock() {
        let mut venue = MockVenuePort::new();
        venue.expect_name().return_const("aave".to_string());
        venue
            .expect_deposit()
            .withf(|&amount| amount == 500)
            .returning(|amount| Ok(amount));
        venue
            .expect_withdraw()
            .returning(|_| Err(VenueError::Unavailable("maintenance".to_string())));

        tokio_test::block_on(async {
            assert_eq!(venue.name(), "aave");
            assert_eq!(venue.deposit(500).await.unwrap(), 500);
            assert!(matches!(
                venue.withdraw(1).await,
                Err(VenueError::Unavailable(_))
            ));
        });
    }
}
