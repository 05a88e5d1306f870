//! Accounting Ledger
//!
//! Tracks how much of the pool's value is investor principal versus earned
//! yield, and performs rate-limited yield release to the configured
//! recipient.
//!
//! Principal is tracked by flow: deposits add to it, withdrawals subtract a
//! proportional slice. Venue balances cannot distinguish principal from
//! yield on their own, so the split is never recomputed from venue state -
//! yield is always the residual `total_value - total_principal`.

use crate::domain::auth::AccountId;
use thiserror::Error;

/// Minimum seconds between successful yield releases (one day).
pub const DEFAULT_MIN_RELEASE_INTERVAL_SECS: u64 = 86_400;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("withdraw of {requested} exceeds pool value {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("yield release cooldown not elapsed: {remaining_secs}s remaining")]
    CooldownNotElapsed { remaining_secs: u64 },

    #[error("recipient identity must not be empty")]
    InvalidRecipient,
}

/// Principal/yield split plus yield-release state.
///
/// All amounts are integer base units of the underlying asset. The ledger
/// performs accounting only; moving the actual asset is the application
/// layer's job.
#[derive(Debug, Clone)]
pub struct AccountingLedger {
    total_value: u64,
    total_principal: u64,
    recipient: AccountId,
    last_release: u64,
    min_release_interval_secs: u64,
}

impl AccountingLedger {
    pub fn new(recipient: AccountId, min_release_interval_secs: u64) -> Result<Self, LedgerError> {
        if recipient.is_empty() {
            return Err(LedgerError::InvalidRecipient);
        }
        Ok(Self {
            total_value: 0,
            total_principal: 0,
            recipient,
            last_release: 0,
            min_release_interval_secs,
        })
    }

    pub fn total_value(&self) -> u64 {
        self.total_value
    }

    pub fn total_principal(&self) -> u64 {
        self.total_principal
    }

    pub fn recipient(&self) -> &AccountId {
        &self.recipient
    }

    pub fn last_release(&self) -> u64 {
        self.last_release
    }

    /// Residual value above tracked principal, eligible for release.
    pub fn accumulated_yield(&self) -> u64 {
        self.total_value.saturating_sub(self.total_principal)
    }

    /// Record an investor deposit: value and principal grow together.
    pub fn on_deposit(&mut self, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.total_value += amount;
        self.total_principal += amount;
        tracing::debug!(
            amount,
            total_value = self.total_value,
            total_principal = self.total_principal,
            "ledger deposit"
        );
        Ok(())
    }

    /// Record an investor withdrawal of `amount` of pool value.
    ///
    /// Principal is reduced by `floor(total_principal * amount / total_value)`
    /// so the principal/yield split stays approximately correct as shares are
    /// redeemed at a value that includes accrued yield. The reduction is
    /// skipped entirely if it would underflow (a defensive floor).
    pub fn on_withdraw(&mut self, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount > self.total_value {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.total_value,
            });
        }
        let proportional =
            (self.total_principal as u128 * amount as u128 / self.total_value as u128) as u64;
        if proportional <= self.total_principal {
            self.total_principal -= proportional;
        }
        self.total_value -= amount;
        tracing::debug!(
            amount,
            proportional,
            total_value = self.total_value,
            total_principal = self.total_principal,
            "ledger withdraw"
        );
        Ok(())
    }

    /// Overwrite `total_value` with the externally observed aggregate
    /// (idle cash plus live venue balances).
    ///
    /// This is how yield accrued inside venues becomes visible to the
    /// ledger. Principal is never touched here.
    pub fn sync_total_value(&mut self, observed: u64) {
        if observed != self.total_value {
            tracing::debug!(
                previous = self.total_value,
                observed,
                "ledger total value synced"
            );
        }
        self.total_value = observed;
    }

    /// Seconds of cooldown left at `now`, if any.
    pub fn cooldown_remaining(&self, now: u64) -> Option<u64> {
        let eligible_at = self.last_release + self.min_release_interval_secs;
        if now < eligible_at {
            Some(eligible_at - now)
        } else {
            None
        }
    }

    /// Release all accumulated yield, returning the released amount.
    ///
    /// Fails while the cooldown is still running. Zero accrued yield is a
    /// successful no-op that does not advance the cooldown, so a release can
    /// fire as soon as real yield appears.
    pub fn release_yield(&mut self, now: u64) -> Result<u64, LedgerError> {
        if let Some(remaining_secs) = self.cooldown_remaining(now) {
            return Err(LedgerError::CooldownNotElapsed { remaining_secs });
        }
        let amount = self.accumulated_yield();
        if amount == 0 {
            return Ok(0);
        }
        self.total_value -= amount;
        self.last_release = now;
        tracing::info!(
            amount,
            recipient = %self.recipient,
            total_value = self.total_value,
            "yield released"
        );
        Ok(amount)
    }

    /// Replace the yield recipient. The old recipient is returned for the
    /// change notification.
    pub fn set_recipient(&mut self, recipient: AccountId) -> Result<AccountId, LedgerError> {
        if recipient.is_empty() {
            return Err(LedgerError::InvalidRecipient);
        }
        let old = std::mem::replace(&mut self.recipient, recipient);
        tracing::info!(old = %old, new = %self.recipient, "yield recipient changed");
        Ok(old)
    }
}
