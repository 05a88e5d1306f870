//! Allocation Engine
//!
//! Coordinates the accounting ledger, allocation controller, and venue
//! ports behind a single state-owning facade. Every operation runs to
//! completion before the next begins; callers serialize access (the service
//! wraps the engine in an `RwLock` and mutating operations hold the write
//! guard for their whole duration).
//!
//! Rebalancing executes through a journal of completed moves: a failed
//! transfer or an unhealthy post-check triggers compensating reversal of
//! every executed move, so the whole rebalance behaves as one transaction.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::domain::{
    AccountId, AccountingLedger, AllocationController, AllocationStatus, AuthError, AuthPolicy,
    ControllerError, DefaultHealthCheck, EngineEvent, EventLog, HealthCheck, LedgerError,
    VenueAllocation, VenueMove,
};
use crate::ports::{PayoutPort, VenuePort};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("asset transfer failed: {0}")]
    TransferFailed(String),

    #[error("post-rebalance health check failed: {0}")]
    HealthCheckFailed(String),
}

/// A venue move that actually executed, recorded for rollback.
#[derive(Debug, Clone)]
enum ExecutedMove {
    Deposited {
        venue: usize,
        amount: u64,
        shares_minted: u64,
    },
    Withdrew {
        venue: usize,
        amount_received: u64,
    },
}

/// State-owning core of the system.
///
/// The ledger and controller hold independent state and are coupled only
/// through the shared total-value figure; the engine owns the idle cash
/// pool and the per-venue share holdings that back it.
pub struct AllocationEngine {
    ledger: AccountingLedger,
    controller: AllocationController,
    venues: Vec<Arc<dyn VenuePort>>,
    payout: Arc<dyn PayoutPort>,
    auth: AuthPolicy,
    health: Box<dyn HealthCheck>,
    events: EventLog,
    /// Shares held in each venue, index-aligned with `venues`.
    shares: Vec<u64>,
    /// Un-deployed cash in the pool's custody.
    idle: u64,
}

impl AllocationEngine {
    pub fn new(
        venues: Vec<Arc<dyn VenuePort>>,
        payout: Arc<dyn PayoutPort>,
        ledger: AccountingLedger,
        controller: AllocationController,
        auth: AuthPolicy,
    ) -> Self {
        let shares = vec![0; venues.len()];
        Self {
            ledger,
            controller,
            venues,
            payout,
            auth,
            health: Box::new(DefaultHealthCheck),
            events: EventLog::new(),
            shares,
            idle: 0,
        }
    }

    /// Replace the post-rebalance health check.
    pub fn with_health_check(mut self, health: Box<dyn HealthCheck>) -> Self {
        self.health = health;
        self
    }

    // ------------------------------------------------------------------
    // User flows
    // ------------------------------------------------------------------

    /// Accept an investor deposit into the idle pool.
    pub async fn deposit(&mut self, amount: u64) -> Result<(), EngineError> {
        self.sync().await?;
        self.ledger.on_deposit(amount)?;
        self.idle += amount;
        Ok(())
    }

    /// Return `amount` of pool value to an investor, pulling from idle cash
    /// first and then from venues in their fixed order.
    pub async fn withdraw(&mut self, amount: u64) -> Result<(), EngineError> {
        let total = self.sync().await?;
        if amount == 0 {
            return Err(LedgerError::ZeroAmount.into());
        }
        if amount > total {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: total,
            }
            .into());
        }
        self.raise_cash(amount).await?;
        self.idle -= amount;
        self.ledger.on_withdraw(amount)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Administrative operations
    // ------------------------------------------------------------------

    /// Store a new target weight vector (admin only).
    pub fn set_target_weights(
        &mut self,
        caller: &AccountId,
        weights: Vec<u16>,
    ) -> Result<(), EngineError> {
        self.auth.ensure_admin(caller)?;
        let old = self.controller.set_target_weights(weights.clone())?;
        self.events.record(EngineEvent::WeightsUpdated {
            old,
            new: weights,
            timestamp: Utc::now().timestamp(),
        });
        Ok(())
    }

    /// Move venue balances toward the target weights (admin only).
    ///
    /// All venue transfers plus the post-check form one transactional
    /// boundary: on any failure, every executed move is reversed before the
    /// error surfaces.
    pub async fn rebalance(&mut self, caller: &AccountId) -> Result<(), EngineError> {
        self.auth.ensure_admin(caller)?;

        let before = self.venue_balances().await?;
        let total = self.idle + before.iter().sum::<u64>();
        self.ledger.sync_total_value(total);

        let plan = self.controller.plan_rebalance(total, &before);
        if plan.is_empty() {
            tracing::debug!("rebalance: nothing to do");
            return Ok(());
        }

        let mut journal: Vec<ExecutedMove> = Vec::new();
        for mv in &plan {
            if let Err(err) = self.execute_move(mv, &mut journal).await {
                tracing::warn!(error = %err, "rebalance move failed, rolling back");
                self.rollback(&journal).await;
                return Err(err);
            }
        }

        let status = self.allocation_status().await?;
        let report = self.health.check(&status);
        if !report.healthy {
            let detail = report.detail.unwrap_or_else(|| "unhealthy".to_string());
            tracing::warn!(detail = %detail, "health check failed after rebalance, rolling back");
            self.rollback(&journal).await;
            return Err(EngineError::HealthCheckFailed(detail));
        }

        let after = self.venue_balances().await?;
        let timestamp = Utc::now().timestamp();
        for (venue, (&b, &a)) in before.iter().zip(after.iter()).enumerate() {
            if b != a {
                self.events.record(EngineEvent::VenueRebalanced {
                    venue: self.venues[venue].name().to_string(),
                    before: b,
                    after: a,
                    timestamp,
                });
            }
        }
        Ok(())
    }

    /// Replace the yield recipient (admin only).
    pub fn set_recipient(
        &mut self,
        caller: &AccountId,
        recipient: AccountId,
    ) -> Result<(), EngineError> {
        self.auth.ensure_admin(caller)?;
        let old = self.ledger.set_recipient(recipient.clone())?;
        self.events.record(EngineEvent::RecipientChanged {
            old,
            new: recipient,
            timestamp: Utc::now().timestamp(),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Yield release
    // ------------------------------------------------------------------

    /// Release accumulated yield to the recipient using the wall clock.
    ///
    /// Open to any caller: the cooldown, not authorization, bounds how often
    /// a release can fire.
    pub async fn release_yield(&mut self) -> Result<u64, EngineError> {
        self.release_yield_at(unix_now()).await
    }

    /// Release accumulated yield as of `now` (epoch seconds).
    pub async fn release_yield_at(&mut self, now: u64) -> Result<u64, EngineError> {
        self.sync().await?;
        if let Some(remaining_secs) = self.ledger.cooldown_remaining(now) {
            return Err(LedgerError::CooldownNotElapsed { remaining_secs }.into());
        }
        let amount = self.ledger.accumulated_yield();
        if amount == 0 {
            tracing::debug!("release: no yield accumulated");
            return Ok(0);
        }

        self.raise_cash(amount).await?;
        self.payout
            .transfer(self.ledger.recipient(), amount)
            .await
            .map_err(|e| EngineError::TransferFailed(e.to_string()))?;
        self.idle -= amount;

        let released = self.ledger.release_yield(now)?;
        self.events.record(EngineEvent::YieldReleased {
            amount: released,
            recipient: self.ledger.recipient().clone(),
            timestamp: Utc::now().timestamp(),
        });
        Ok(released)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn accumulated_yield(&self) -> u64 {
        self.ledger.accumulated_yield()
    }

    pub fn total_user_principal(&self) -> u64 {
        self.ledger.total_principal()
    }

    pub fn total_value(&self) -> u64 {
        self.ledger.total_value()
    }

    pub fn target_weights(&self) -> Option<&[u16]> {
        self.controller.target_weights()
    }

    pub fn recipient(&self) -> &AccountId {
        self.ledger.recipient()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn venue_names(&self) -> Vec<String> {
        self.venues.iter().map(|v| v.name().to_string()).collect()
    }

    /// Live snapshot: total value, idle cash, per-venue balance and target.
    pub async fn allocation_status(&self) -> Result<AllocationStatus, EngineError> {
        let balances = self.venue_balances().await?;
        let total_value = self.idle + balances.iter().sum::<u64>();
        let venues = self
            .venues
            .iter()
            .zip(balances)
            .enumerate()
            .map(|(i, (venue, balance))| VenueAllocation {
                name: venue.name().to_string(),
                balance,
                target_bps: self
                    .controller
                    .target_weights()
                    .map(|w| w[i])
                    .unwrap_or(0),
            })
            .collect();
        Ok(AllocationStatus {
            total_value,
            idle: self.idle,
            venues,
        })
    }

    /// Refresh the ledger's total value from idle cash plus live venue
    /// balances; returns the observed total.
    pub async fn sync(&mut self) -> Result<u64, EngineError> {
        let balances = self.venue_balances().await?;
        let total = self.idle + balances.iter().sum::<u64>();
        self.ledger.sync_total_value(total);
        Ok(total)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn venue_balances(&self) -> Result<Vec<u64>, EngineError> {
        let mut balances = Vec::with_capacity(self.venues.len());
        for venue in &self.venues {
            let balance = venue
                .balance()
                .await
                .map_err(|e| EngineError::TransferFailed(e.to_string()))?;
            balances.push(balance);
        }
        Ok(balances)
    }

    /// Ensure `amount` of cash sits in the idle pool, redeeming venue
    /// shares in fixed venue order as needed.
    async fn raise_cash(&mut self, amount: u64) -> Result<(), EngineError> {
        let mut still_needed = amount.saturating_sub(self.idle);
        for venue in 0..self.venues.len() {
            if still_needed == 0 {
                break;
            }
            let (received, _) = self.withdraw_value_from_venue(venue, still_needed).await?;
            self.idle += received;
            still_needed = still_needed.saturating_sub(received);
        }
        if self.idle < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.idle,
            }
            .into());
        }
        Ok(())
    }

    /// Redeem enough shares from `venue` to receive about `amount` of
    /// value. Share conversion is proportional: `ceil(amount * shares /
    /// balance)` clamped to held shares, so rounding overshoots toward idle
    /// cash rather than stranding value.
    async fn withdraw_value_from_venue(
        &mut self,
        venue: usize,
        amount: u64,
    ) -> Result<(u64, u64), EngineError> {
        let balance = self.venues[venue]
            .balance()
            .await
            .map_err(|e| EngineError::TransferFailed(e.to_string()))?;
        let held = self.shares[venue];
        if balance == 0 || held == 0 {
            return Ok((0, 0));
        }
        let take = amount.min(balance);
        let shares = (((take as u128 * held as u128) + balance as u128 - 1) / balance as u128)
            .min(held as u128) as u64;
        let received = self.venues[venue]
            .withdraw(shares)
            .await
            .map_err(|e| EngineError::TransferFailed(e.to_string()))?;
        self.shares[venue] -= shares;
        Ok((received, shares))
    }

    async fn execute_move(
        &mut self,
        mv: &VenueMove,
        journal: &mut Vec<ExecutedMove>,
    ) -> Result<(), EngineError> {
        match *mv {
            VenueMove::Withdraw { venue, amount } => {
                let (received, _) = self.withdraw_value_from_venue(venue, amount).await?;
                self.idle += received;
                journal.push(ExecutedMove::Withdrew {
                    venue,
                    amount_received: received,
                });
            }
            VenueMove::Deposit { venue, amount } => {
                // Share-rounding on prior withdrawals can leave idle a unit
                // short of the planned amount; clamp rather than fail.
                let amount = amount.min(self.idle);
                if amount == 0 {
                    return Ok(());
                }
                let shares_minted = self.venues[venue]
                    .deposit(amount)
                    .await
                    .map_err(|e| EngineError::TransferFailed(e.to_string()))?;
                self.shares[venue] += shares_minted;
                self.idle -= amount;
                journal.push(ExecutedMove::Deposited {
                    venue,
                    amount,
                    shares_minted,
                });
            }
        }
        Ok(())
    }

    /// Reverse executed moves in LIFO order. Best effort: a failing
    /// compensation is logged and skipped so the remaining moves still
    /// unwind.
    async fn rollback(&mut self, journal: &[ExecutedMove]) {
        for mv in journal.iter().rev() {
            match *mv {
                ExecutedMove::Deposited {
                    venue,
                    amount,
                    shares_minted,
                } => {
                    let result = self.venues[venue].withdraw(shares_minted).await;
                    match result {
                        Ok(returned) => {
                            self.shares[venue] -= shares_minted;
                            self.idle += returned;
                        }
                        Err(err) => {
                            tracing::error!(
                                venue = self.venues[venue].name(),
                                amount,
                                error = %err,
                                "rollback: failed to reverse deposit"
                            );
                        }
                    }
                }
                ExecutedMove::Withdrew {
                    venue,
                    amount_received,
                } => {
                    // A failed deposit reversal earlier in the unwind can
                    // leave idle short of the recorded amount; re-deposit
                    // only what idle can cover.
                    let amount = amount_received.min(self.idle);
                    if amount == 0 {
                        continue;
                    }
                    let result = self.venues[venue].deposit(amount).await;
                    match result {
                        Ok(minted) => {
                            self.shares[venue] += minted;
                            self.idle -= amount;
                        }
                        Err(err) => {
                            tracing::error!(
                                venue = self.venues[venue].name(),
                                amount,
                                error = %err,
                                "rollback: failed to reverse withdrawal"
                            );
                        }
                    }
                }
            }
        }
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::DEFAULT_MIN_RELEASE_INTERVAL_SECS as DAY;
    use crate::domain::{AllocationPolicy, HealthReport};
    use crate::ports::mocks::{MockPayout, MockVenue};

    const VENUES: [&str; 4] = ["aave", "morpho", "spark", "uniswap"];

    struct Fixture {
        engine: AllocationEngine,
        venues: Vec<Arc<MockVenue>>,
        payout: Arc<MockPayout>,
    }

    fn fixture() -> Fixture {
        let venues: Vec<Arc<MockVenue>> =
            VENUES.iter().map(|n| Arc::new(MockVenue::new(*n))).collect();
        let payout = Arc::new(MockPayout::new());
        let ports: Vec<Arc<dyn VenuePort>> = venues
            .iter()
            .map(|v| Arc::clone(v) as Arc<dyn VenuePort>)
            .collect();
        let ledger = AccountingLedger::new(AccountId::from("charity"), DAY).unwrap();
        let controller = AllocationController::new(4, AllocationPolicy::default());
        let auth = AuthPolicy::new(AccountId::from("admin"));
        let engine = AllocationEngine::new(
            ports,
            Arc::clone(&payout) as Arc<dyn PayoutPort>,
            ledger,
            controller,
            auth,
        );
        Fixture {
            engine,
            venues,
            payout,
        }
    }

    fn admin() -> AccountId {
        AccountId::from("admin")
    }

    struct AlwaysUnhealthy;

    impl HealthCheck for AlwaysUnhealthy {
        fn check(&self, _status: &AllocationStatus) -> HealthReport {
            HealthReport::unhealthy("reconciliation mismatch")
        }
    }

    #[tokio::test]
    async fn test_deposit_and_withdraw_round_trip() {
        let mut f = fixture();
        f.engine.deposit(1000).await.unwrap();
        assert_eq!(f.engine.total_value(), 1000);
        assert_eq!(f.engine.total_user_principal(), 1000);

        f.engine.withdraw(1000).await.unwrap();
        assert_eq!(f.engine.total_value(), 0);
        assert_eq!(f.engine.total_user_principal(), 0);
    }

    #[tokio::test]
    async fn test_withdraw_beyond_pool_rejected() {
        let mut f = fixture();
        f.engine.deposit(100).await.unwrap();
        let err = f.engine.withdraw(101).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Ledger(LedgerError::InsufficientBalance { .. })
        ));
    }

    #[tokio::test]
    async fn test_admin_gating() {
        let mut f = fixture();
        let mallory = AccountId::from("mallory");

        assert!(matches!(
            f.engine
                .set_target_weights(&mallory, vec![4000, 3000, 2000, 1000]),
            Err(EngineError::Auth(AuthError::NotAuthorized(_)))
        ));
        assert!(matches!(
            f.engine.rebalance(&mallory).await,
            Err(EngineError::Auth(AuthError::NotAuthorized(_)))
        ));
        assert!(matches!(
            f.engine.set_recipient(&mallory, AccountId::from("x")),
            Err(EngineError::Auth(AuthError::NotAuthorized(_)))
        ));
    }

    #[tokio::test]
    async fn test_rebalance_from_idle_deploys_targets() {
        let mut f = fixture();
        f.engine.deposit(1000).await.unwrap();
        f.engine
            .set_target_weights(&admin(), vec![4000, 3000, 2000, 1000])
            .unwrap();
        f.engine.rebalance(&admin()).await.unwrap();

        let balances: Vec<u64> = {
            let mut out = Vec::new();
            for v in &f.venues {
                out.push(v.balance_now());
            }
            out
        };
        assert_eq!(balances, vec![400, 300, 200, 100]);

        let status = f.engine.allocation_status().await.unwrap();
        assert_eq!(status.total_value, 1000);
        assert_eq!(status.idle, 0);
    }

    #[tokio::test]
    async fn test_rebalance_rolls_back_on_transfer_failure() {
        let mut f = fixture();
        f.engine.deposit(1000).await.unwrap();
        f.engine
            .set_target_weights(&admin(), vec![4000, 3000, 2000, 1000])
            .unwrap();

        // Third venue rejects the deposit after two venues already funded.
        f.venues[2].set_fail_deposits(true);
        let err = f.engine.rebalance(&admin()).await.unwrap_err();
        assert!(matches!(err, EngineError::TransferFailed(_)));

        // Compensations restored the pre-rebalance state.
        for v in &f.venues {
            assert_eq!(v.balance_now(), 0);
        }
        let status = f.engine.allocation_status().await.unwrap();
        assert_eq!(status.idle, 1000);
        assert_eq!(status.total_value, 1000);
    }

    #[tokio::test]
    async fn test_rebalance_rolls_back_on_unhealthy_check() {
        let f = fixture();
        let mut engine = f.engine.with_health_check(Box::new(AlwaysUnhealthy));
        engine.deposit(1000).await.unwrap();
        engine
            .set_target_weights(&admin(), vec![4000, 3000, 2000, 1000])
            .unwrap();

        let err = engine.rebalance(&admin()).await.unwrap_err();
        assert!(matches!(err, EngineError::HealthCheckFailed(_)));
        for v in &f.venues {
            assert_eq!(v.balance_now(), 0);
        }
        let status = engine.allocation_status().await.unwrap();
        assert_eq!(status.idle, 1000);
    }

    #[tokio::test]
    async fn test_release_yield_scenario() {
        let mut f = fixture();
        f.engine.deposit(100).await.unwrap();
        f.engine
            .set_target_weights(&admin(), vec![4000, 3000, 2000, 1000])
            .unwrap();
        f.engine.rebalance(&admin()).await.unwrap();

        // Venue yield brings total value to 110.
        f.venues[0].accrue(10);
        f.engine.sync().await.unwrap();
        assert_eq!(f.engine.accumulated_yield(), 10);

        let released = f.engine.release_yield_at(DAY).await.unwrap();
        assert_eq!(released, 10);
        assert_eq!(f.payout.balance_of(&AccountId::from("charity")), 10);
        assert_eq!(f.engine.total_value(), 100);
        assert_eq!(f.engine.accumulated_yield(), 0);
    }

    #[tokio::test]
    async fn test_release_yield_cooldown() {
        let mut f = fixture();
        f.engine.deposit(100).await.unwrap();

        // Well inside the one-day cooldown window.
        let err = f.engine.release_yield_at(10).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Ledger(LedgerError::CooldownNotElapsed { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_yield_release_returns_zero() {
        let mut f = fixture();
        f.engine.deposit(100).await.unwrap();
        assert_eq!(f.engine.release_yield_at(DAY).await.unwrap(), 0);
        assert_eq!(f.payout.balance_of(&AccountId::from("charity")), 0);
    }

    #[tokio::test]
    async fn test_withdraw_pulls_from_venues() {
        let mut f = fixture();
        f.engine.deposit(1000).await.unwrap();
        f.engine
            .set_target_weights(&admin(), vec![4000, 3000, 2000, 1000])
            .unwrap();
        f.engine.rebalance(&admin()).await.unwrap();

        // Idle is now 0; a withdrawal must redeem venue shares.
        f.engine.withdraw(500).await.unwrap();
        assert_eq!(f.engine.total_value(), 500);
        assert_eq!(f.engine.total_user_principal(), 500);
    }

    #[tokio::test]
    async fn test_set_recipient_emits_event() {
        let mut f = fixture();
        f.engine
            .set_recipient(&admin(), AccountId::from("new-charity"))
            .unwrap();
        assert_eq!(f.engine.recipient(), &AccountId::from("new-charity"));
        assert!(f
            .engine
            .events()
            .iter()
            .any(|e| matches!(e, EngineEvent::RecipientChanged { .. })));
    }

    #[tokio::test]
    async fn test_rebalance_without_weights_is_noop() {
        let mut f = fixture();
        f.engine.deposit(1000).await.unwrap();
        f.engine.rebalance(&admin()).await.unwrap();
        for v in &f.venues {
            assert_eq!(v.balance_now(), 0);
        }
    }
}
