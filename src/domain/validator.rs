//! Allocation Validator
//!
//! Pure, stateless checks over proposed weight vectors, plus the
//! post-rebalance health hook.

use crate::domain::controller::AllocationStatus;
use thiserror::Error;

/// Fixed-point denominator for weights: 10_000 basis points = 100%.
pub const WHOLE_BPS: u16 = 10_000;

/// Default diversification ceiling per venue (80%).
pub const DEFAULT_MAX_WEIGHT_BPS: u16 = 8_000;

/// Default minimum participation floor per venue (5%).
pub const DEFAULT_MIN_WEIGHT_BPS: u16 = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("weights sum to {sum} bps, expected {}", WHOLE_BPS)]
    InvalidWeightSum { sum: u32 },

    #[error("weight {weight_bps} bps for venue {index} outside [{min_bps}, {max_bps}]")]
    WeightOutOfBounds {
        index: usize,
        weight_bps: u16,
        min_bps: u16,
        max_bps: u16,
    },
}

/// Per-venue bounds applied to every proposed weight vector.
#[derive(Debug, Clone)]
pub struct WeightPolicy {
    /// Diversification ceiling: no venue may hold more than this.
    pub max_weight_bps: u16,
    /// Minimum participation floor, only applied when enforcement is on.
    pub min_weight_bps: u16,
    pub enforce_min_weight: bool,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self {
            max_weight_bps: DEFAULT_MAX_WEIGHT_BPS,
            min_weight_bps: DEFAULT_MIN_WEIGHT_BPS,
            enforce_min_weight: true,
        }
    }
}

/// Structural check on a proposed weight vector.
///
/// Total and side-effect-free: the sum must be exactly [`WHOLE_BPS`] and
/// every entry must respect the policy bounds.
pub fn validate_weights(weights: &[u16], policy: &WeightPolicy) -> Result<(), ValidationError> {
    let sum: u32 = weights.iter().map(|&w| w as u32).sum();
    if sum != WHOLE_BPS as u32 {
        return Err(ValidationError::InvalidWeightSum { sum });
    }
    let min_bps = if policy.enforce_min_weight {
        policy.min_weight_bps
    } else {
        0
    };
    for (index, &weight_bps) in weights.iter().enumerate() {
        if weight_bps > policy.max_weight_bps || weight_bps < min_bps {
            return Err(ValidationError::WeightOutOfBounds {
                index,
                weight_bps,
                min_bps,
                max_bps: policy.max_weight_bps,
            });
        }
    }
    Ok(())
}

/// Outcome of a [`HealthCheck`].
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub healthy: bool,
    pub detail: Option<String>,
}

impl HealthReport {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            detail: None,
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: Some(detail.into()),
        }
    }
}

/// System-level consistency check run after every rebalance.
///
/// Implementations could reconcile reported venue balances plus idle cash
/// against the ledger total, or enforce per-venue exposure ceilings. The
/// engine rolls back the whole rebalance when a check reports unhealthy.
pub trait HealthCheck: Send + Sync {
    fn check(&self, status: &AllocationStatus) -> HealthReport;
}

/// Reference health check: always healthy.
///
/// This mirrors the source system, where the post-rebalance check was a
/// placeholder. The trait is the extension point for real reconciliation.
#[derive(Debug, Default)]
pub struct DefaultHealthCheck;

impl HealthCheck for DefaultHealthCheck {
    fn check(&self, _status: &AllocationStatus) -> HealthReport {
        HealthReport::healthy()
    }
}
