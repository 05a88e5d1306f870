//! Allocation Controller
//!
//! Owns the target weight vector and the rebalancing algorithm. The first
//! accepted vector initializes the controller unconditionally; every later
//! update is bounded by the drift limit so a bad recommendation cannot move
//! the whole pool in one step.
//!
//! Planning is pure: the controller converts a target vector plus current
//! venue balances into a sequence of venue moves and never touches a venue
//! itself.

use crate::domain::validator::{validate_weights, ValidationError, WeightPolicy, WHOLE_BPS};
use thiserror::Error;

/// Default maximum single-step change per venue weight (20 percentage
/// points).
pub const DEFAULT_MAX_STEP_DELTA_BPS: u16 = 2_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("expected {expected} weights, got {actual}")]
    WeightCountMismatch { expected: usize, actual: usize },

    #[error("weight change of {delta_bps} bps for venue {index} exceeds limit {max_bps} bps")]
    ExcessiveAllocationChange {
        index: usize,
        delta_bps: u16,
        max_bps: u16,
    },
}

/// Weight bounds plus the per-step drift limit.
#[derive(Debug, Clone)]
pub struct AllocationPolicy {
    pub weights: WeightPolicy,
    pub max_step_delta_bps: u16,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            weights: WeightPolicy::default(),
            max_step_delta_bps: DEFAULT_MAX_STEP_DELTA_BPS,
        }
    }
}

/// A single planned asset movement between idle cash and a venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueMove {
    /// Move `amount` of idle cash into the venue.
    Deposit { venue: usize, amount: u64 },
    /// Pull `amount` of value out of the venue back to idle cash.
    Withdraw { venue: usize, amount: u64 },
}

/// Per-venue slice of an [`AllocationStatus`].
#[derive(Debug, Clone)]
pub struct VenueAllocation {
    pub name: String,
    pub balance: u64,
    pub target_bps: u16,
}

/// Read model of the current allocation: total value, idle cash, and each
/// venue's live balance with its target weight.
#[derive(Debug, Clone)]
pub struct AllocationStatus {
    pub total_value: u64,
    pub idle: u64,
    pub venues: Vec<VenueAllocation>,
}

#[derive(Debug, Clone)]
pub struct AllocationController {
    venue_count: usize,
    target_weights: Option<Vec<u16>>,
    policy: AllocationPolicy,
}

impl AllocationController {
    pub fn new(venue_count: usize, policy: AllocationPolicy) -> Self {
        Self {
            venue_count,
            target_weights: None,
            policy,
        }
    }

    /// True once the first weight vector has been accepted.
    pub fn is_initialized(&self) -> bool {
        self.target_weights.is_some()
    }

    pub fn target_weights(&self) -> Option<&[u16]> {
        self.target_weights.as_deref()
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    /// Accept a new target weight vector, returning the previous one.
    ///
    /// Structural validation always applies. The drift limit applies only
    /// after initialization: any single venue's weight may move at most
    /// `max_step_delta_bps` per update, forcing large reallocations to occur
    /// over multiple independently observable steps.
    pub fn set_target_weights(
        &mut self,
        weights: Vec<u16>,
    ) -> Result<Option<Vec<u16>>, ControllerError> {
        if weights.len() != self.venue_count {
            return Err(ControllerError::WeightCountMismatch {
                expected: self.venue_count,
                actual: weights.len(),
            });
        }
        validate_weights(&weights, &self.policy.weights)?;

        if let Some(old) = &self.target_weights {
            for (index, (&new_w, &old_w)) in weights.iter().zip(old.iter()).enumerate() {
                let delta_bps = new_w.abs_diff(old_w);
                if delta_bps > self.policy.max_step_delta_bps {
                    return Err(ControllerError::ExcessiveAllocationChange {
                        index,
                        delta_bps,
                        max_bps: self.policy.max_step_delta_bps,
                    });
                }
            }
        }

        Ok(self.target_weights.replace(weights))
    }

    /// Plan the venue moves that bring balances toward the target weights.
    ///
    /// Per-venue target is `floor(total_value * weight / WHOLE_BPS)`.
    /// Withdrawals are emitted before deposits so freed value can fund them
    /// out of the single idle pool; within each class, venues keep their
    /// fixed configured order. An uninitialized controller plans nothing.
    pub fn plan_rebalance(&self, total_value: u64, current_balances: &[u64]) -> Vec<VenueMove> {
        let weights = match &self.target_weights {
            Some(w) => w,
            None => return Vec::new(),
        };
        debug_assert_eq!(current_balances.len(), weights.len());

        let mut withdrawals = Vec::new();
        let mut deposits = Vec::new();
        for (venue, (&weight, &current)) in weights.iter().zip(current_balances).enumerate() {
            let target = (total_value as u128 * weight as u128 / WHOLE_BPS as u128) as u64;
            if target > current {
                deposits.push(VenueMove::Deposit {
                    venue,
                    amount: target - current,
                });
            } else if current > target {
                withdrawals.push(VenueMove::Withdraw {
                    venue,
                    amount: current - target,
                });
            }
        }
        withdrawals.extend(deposits);
        withdrawals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> AllocationController {
        AllocationController::new(4, AllocationPolicy::default())
    }

    #[test]
    fn test_first_vector_accepted_without_drift_check() {
        let mut c = controller();
        assert!(!c.is_initialized());
        // A huge swing from "nothing" is fine on the first call.
        let old = c.set_target_weights(vec![8000, 500, 1000, 500]).unwrap();
        assert!(old.is_none());
        assert!(c.is_initialized());
    }

    #[test]
    fn test_structural_validation_applies_to_first_vector() {
        let mut c = controller();
        let err = c.set_target_weights(vec![4000, 3000, 2000, 500]).unwrap_err();
        assert_eq!(
            err,
            ControllerError::Validation(ValidationError::InvalidWeightSum { sum: 9500 })
        );
        assert!(!c.is_initialized());
    }

    #[test]
    fn test_drift_limit_on_subsequent_updates() {
        let mut c = controller();
        c.set_target_weights(vec![4000, 3000, 2000, 1000]).unwrap();

        // Delta of 2500 bps on the first venue exceeds the 2000 bps limit.
        let err = c.set_target_weights(vec![6500, 1500, 1500, 500]).unwrap_err();
        assert_eq!(
            err,
            ControllerError::ExcessiveAllocationChange {
                index: 0,
                delta_bps: 2500,
                max_bps: 2000,
            }
        );
        // Target unchanged after rejection.
        assert_eq!(c.target_weights(), Some(&[4000, 3000, 2000, 1000][..]));

        // A bounded step in the same direction is fine, and returns the old
        // vector.
        let old = c.set_target_weights(vec![6000, 2000, 1000, 1000]).unwrap();
        assert_eq!(old, Some(vec![4000, 3000, 2000, 1000]));
    }

    #[test]
    fn test_drift_limit_is_exactly_at_boundary() {
        let mut c = controller();
        c.set_target_weights(vec![4000, 3000, 2000, 1000]).unwrap();
        // Exactly 2000 bps of movement is allowed.
        assert!(c.set_target_weights(vec![6000, 1000, 2000, 1000]).is_ok());
    }

    #[test]
    fn test_weight_count_mismatch() {
        let mut c = controller();
        let err = c.set_target_weights(vec![5000, 5000]).unwrap_err();
        assert_eq!(
            err,
            ControllerError::WeightCountMismatch {
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn test_plan_from_empty_venues_is_all_deposits() {
        let mut c = controller();
        c.set_target_weights(vec![4000, 3000, 2000, 1000]).unwrap();

        let plan = c.plan_rebalance(1000, &[0, 0, 0, 0]);
        assert_eq!(
            plan,
            vec![
                VenueMove::Deposit { venue: 0, amount: 400 },
                VenueMove::Deposit { venue: 1, amount: 300 },
                VenueMove::Deposit { venue: 2, amount: 200 },
                VenueMove::Deposit { venue: 3, amount: 100 },
            ]
        );
    }

    #[test]
    fn test_plan_emits_withdrawals_before_deposits() {
        let mut c = controller();
        c.set_target_weights(vec![4000, 3000, 2000, 1000]).unwrap();

        // Venue 3 is overweight, venue 0 underweight.
        let plan = c.plan_rebalance(1000, &[100, 300, 200, 400]);
        assert_eq!(
            plan,
            vec![
                VenueMove::Withdraw { venue: 3, amount: 300 },
                VenueMove::Deposit { venue: 0, amount: 300 },
            ]
        );
    }

    #[test]
    fn test_plan_targets_floor_division() {
        let policy = AllocationPolicy {
            weights: WeightPolicy {
                enforce_min_weight: false,
                ..WeightPolicy::default()
            },
            ..AllocationPolicy::default()
        };
        let mut c = AllocationController::new(4, policy);
        c.set_target_weights(vec![3333, 3333, 3334, 0]).unwrap();

        // floor(100 * 3333 / 10000) = 33, floor(100 * 3334 / 10000) = 33.
        let plan = c.plan_rebalance(100, &[0, 0, 0, 0]);
        assert_eq!(
            plan,
            vec![
                VenueMove::Deposit { venue: 0, amount: 33 },
                VenueMove::Deposit { venue: 1, amount: 33 },
                VenueMove::Deposit { venue: 2, amount: 33 },
            ]
        );
    }

    #[test]
    fn test_plan_uninitialized_is_empty() {
        let c = controller();
        assert!(c.plan_rebalance(1000, &[0, 0, 0, 0]).is_empty());
    }

    #[test]
    fn test_plan_balanced_pool_is_empty() {
        let mut c = controller();
        c.set_target_weights(vec![4000, 3000, 2000, 1000]).unwrap();
        assert!(c.plan_rebalance(1000, &[400, 300, 200, 100]).is_empty());
    }
}
