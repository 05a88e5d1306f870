//! Payout Port
//!
//! Moves the underlying asset out of the pool's custody, used by yield
//! release. A failed transfer surfaces synchronously and leaves the ledger
//! untouched.

use crate::domain::AccountId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayoutError {
    #[error("payout transfer failed: {0}")]
    TransferFailed(String),
}

#[async_trait::async_trait]
pub trait PayoutPort: Send + Sync {
    /// Transfer `amount` of the asset to `to`.
    async fn transfer(&self, to: &AccountId, amount: u64) -> Result<(), PayoutError>;
}
