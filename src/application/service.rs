//! Allocation Service
//!
//! Periodic loop that drives the engine: refresh state, pull a weight
//! recommendation, apply it, rebalance, and attempt a yield release. The
//! engine sits behind an `RwLock` and every mutating step holds the write
//! guard for its full duration, so operations stay strictly serialized.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::adapters::recommender::{RecommenderClient, RecommenderError};
use crate::application::engine::{AllocationEngine, EngineError};
use crate::domain::{AccountId, LedgerError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("recommendation fetch failed: {0}")]
    Recommendation(#[from] RecommenderError),
}

/// Status snapshot of the service.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub is_running: bool,
    pub total_value: u64,
    pub total_principal: u64,
    pub accumulated_yield: u64,
    pub weights: Option<Vec<u16>>,
}

/// Drives the allocation engine on a fixed poll interval.
pub struct AllocationService {
    engine: Arc<RwLock<AllocationEngine>>,
    recommender: Option<RecommenderClient>,
    admin: AccountId,
    poll_interval: Duration,
    is_running: Arc<RwLock<bool>>,
}

impl AllocationService {
    pub fn new(
        engine: AllocationEngine,
        recommender: Option<RecommenderClient>,
        admin: AccountId,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            recommender,
            admin,
            poll_interval,
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    pub fn engine(&self) -> Arc<RwLock<AllocationEngine>> {
        Arc::clone(&self.engine)
    }

    /// Run the allocation loop until stopped.
    pub async fn run(&self) -> Result<(), ServiceError> {
        *self.is_running.write().await = true;
        tracing::info!(
            poll_interval = ?self.poll_interval,
            recommender = self.recommender.is_some(),
            "allocation service started"
        );

        while *self.is_running.read().await {
            if let Err(e) = self.tick().await {
                // Individual ticks fail independently; the loop keeps going
                // and the orchestration layer decides whether to resubmit.
                tracing::error!(error = %e, "tick error");
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::info!("allocation service stopped");
        Ok(())
    }

    /// One allocation cycle.
    pub async fn tick(&self) -> Result<(), ServiceError> {
        let mut engine = self.engine.write().await;
        let total = engine.sync().await?;
        tracing::debug!(total, "state synced");

        if let Some(recommender) = &self.recommender {
            let names = engine.venue_names();
            match recommender.fetch_weights(&names).await {
                Ok(weights) => {
                    if let Err(e) = engine.set_target_weights(&self.admin, weights) {
                        tracing::warn!(error = %e, "recommendation rejected");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "recommendation unavailable"),
            }
        }

        engine.rebalance(&self.admin).await?;

        match engine.release_yield().await {
            Ok(0) => {}
            Ok(amount) => tracing::info!(amount, "yield released this tick"),
            Err(EngineError::Ledger(LedgerError::CooldownNotElapsed { remaining_secs })) => {
                tracing::debug!(remaining_secs, "release cooldown still running");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Stop the loop after the current tick.
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        tracing::info!("stop signal sent to allocation service");
    }

    pub async fn status(&self) -> ServiceStatus {
        let engine = self.engine.read().await;
        ServiceStatus {
            is_running: *self.is_running.read().await,
            total_value: engine.total_value(),
            total_principal: engine.total_user_principal(),
            accumulated_yield: engine.accumulated_yield(),
            weights: engine.target_weights().map(|w| w.to_vec()),
        }
    }
}

impl Clone for AllocationService {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            recommender: self.recommender.clone(),
            admin: self.admin.clone(),
            poll_interval: self.poll_interval,
            is_running: Arc::clone(&self.is_running),
        }
    }
}
