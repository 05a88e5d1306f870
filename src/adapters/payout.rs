//! Local Payout Sink
//!
//! Credits yield payouts to an in-memory account book and logs each
//! transfer. Production deployments replace this with a real settlement
//! adapter behind [`crate::ports::PayoutPort`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::AccountId;
use crate::ports::payout::{PayoutError, PayoutPort};

#[derive(Debug, Default)]
pub struct LocalPayout {
    paid: Mutex<HashMap<AccountId, u64>>,
}

impl LocalPayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative amount paid to `account`.
    pub fn total_paid(&self, account: &AccountId) -> u64 {
        self.paid
            .lock()
            .unwrap()
            .get(account)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PayoutPort for LocalPayout {
    async fn transfer(&self, to: &AccountId, amount: u64) -> Result<(), PayoutError> {
        *self.paid.lock().unwrap().entry(to.clone()).or_insert(0) += amount;
        tracing::info!(to = %to, amount, "payout recorded");
        Ok(())
    }
}
