//! Engine Events
//!
//! Every state mutation emits a notification carrying the relevant
//! before/after amounts and a timestamp. Events land in a bounded in-memory
//! log for observability collaborators and are mirrored to `tracing`.

use crate::domain::auth::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum events retained in memory.
pub const MAX_EVENT_LOG_ENTRIES: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    WeightsUpdated {
        old: Option<Vec<u16>>,
        new: Vec<u16>,
        timestamp: i64,
    },
    VenueRebalanced {
        venue: String,
        before: u64,
        after: u64,
        timestamp: i64,
    },
    RecipientChanged {
        old: AccountId,
        new: AccountId,
        timestamp: i64,
    },
    YieldReleased {
        amount: u64,
        recipient: AccountId,
        timestamp: i64,
    },
}

/// Bounded FIFO log of engine events.
#[derive(Debug, Default)]
pub struct EventLog {
    events: VecDeque<EngineEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: EngineEvent) {
        match &event {
            EngineEvent::WeightsUpdated { old, new, .. } => {
                tracing::info!(?old, ?new, "target weights updated");
            }
            EngineEvent::VenueRebalanced {
                venue,
                before,
                after,
                ..
            } => {
                tracing::info!(venue, before, after, "venue rebalanced");
            }
            EngineEvent::RecipientChanged { old, new, .. } => {
                tracing::info!(old = %old, new = %new, "recipient changed");
            }
            EngineEvent::YieldReleased {
                amount, recipient, ..
            } => {
                tracing::info!(amount, recipient = %recipient, "yield released to recipient");
            }
        }
        if self.events.len() == MAX_EVENT_LOG_ENTRIES {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
