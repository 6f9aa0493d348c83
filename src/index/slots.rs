//! Active/shadow slot tracking for zero-downtime rebuilds

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use tracing::{info, warn};

use crate::error::{IndexError, Result};

/// Physical slot suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSuffix {
    A,
    B,
}

impl SlotSuffix {
    pub fn other(self) -> Self {
        match self {
            SlotSuffix::A => SlotSuffix::B,
            SlotSuffix::B => SlotSuffix::A,
        }
    }
}

impl fmt::Display for SlotSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotSuffix::A => write!(f, "a"),
            SlotSuffix::B => write!(f, "b"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SlotState {
    active: SlotSuffix,
    rebuilding: bool,
}

/// Per-alias active/shadow state, derived at startup and never persisted.
///
/// Reads of the active slot are safe concurrently with an in-progress
/// rebuild: readers keep seeing the old active slot until the swap, which
/// happens atomically under the per-alias lock.
pub struct RebuildSlotManager {
    states: DashMap<String, Mutex<SlotState>>,
}

impl RebuildSlotManager {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// The physical index name for an alias and slot suffix
    pub fn physical_name(alias: &str, suffix: SlotSuffix) -> String {
        format!("{}__{}", alias, suffix)
    }

    /// Register an alias with the slot probed non-empty at startup
    pub fn register(&self, alias: &str, active: SlotSuffix) {
        self.states.insert(
            alias.to_string(),
            Mutex::new(SlotState {
                active,
                rebuilding: false,
            }),
        );
    }

    fn with_state<T>(&self, alias: &str, f: impl FnOnce(&mut SlotState) -> T) -> Result<T> {
        let entry = self
            .states
            .get(alias)
            .ok_or_else(|| IndexError::UnknownIndex(alias.to_string()))?;
        let mut state = entry.lock();
        Ok(f(&mut state))
    }

    /// Physical name currently serving reads
    pub fn active_index_name(&self, alias: &str) -> Result<String> {
        self.with_state(alias, |state| Self::physical_name(alias, state.active))
    }

    /// Physical name of the inactive copy (the rebuild write target)
    pub fn shadow_index_name(&self, alias: &str) -> Result<String> {
        self.with_state(alias, |state| {
            Self::physical_name(alias, state.active.other())
        })
    }

    /// Physical name incremental writes should target: the shadow while a
    /// rebuild is repopulating it, otherwise the active slot
    pub fn write_index_name(&self, alias: &str) -> Result<String> {
        self.with_state(alias, |state| {
            let suffix = if state.rebuilding {
                state.active.other()
            } else {
                state.active
            };
            Self::physical_name(alias, suffix)
        })
    }

    pub fn is_rebuilding(&self, alias: &str) -> Result<bool> {
        self.with_state(alias, |state| state.rebuilding)
    }

    /// Mark a rebuild as started and return the shadow name, or `None` when a
    /// rebuild is already running for this alias (logged, no-op)
    pub fn try_start(&self, alias: &str) -> Result<Option<String>> {
        self.with_state(alias, |state| {
            if state.rebuilding {
                warn!(alias = %alias, "rebuild already in progress, start ignored");
                return None;
            }
            state.rebuilding = true;
            Some(Self::physical_name(alias, state.active.other()))
        })
    }

    /// Finish a rebuild: swap the active slot when the shadow probed healthy,
    /// otherwise leave the active slot untouched. Returns whether a swap
    /// happened.
    pub fn complete(&self, alias: &str, healthy: bool) -> Result<bool> {
        self.with_state(alias, |state| {
            if !state.rebuilding {
                warn!(alias = %alias, "complete called without a running rebuild");
                return false;
            }
            state.rebuilding = false;
            if healthy {
                state.active = state.active.other();
                info!(alias = %alias, active = %state.active, "index slot swapped");
                true
            } else {
                warn!(alias = %alias, "shadow slot unhealthy, rebuild cancelled");
                false
            }
        })
    }

    /// Cancel a rebuild without swapping; safe to retry afterwards
    pub fn cancel(&self, alias: &str) -> Result<()> {
        self.with_state(alias, |state| {
            if state.rebuilding {
                state.rebuilding = false;
                info!(alias = %alias, "rebuild cancelled");
            }
        })
    }
}

impl Default for RebuildSlotManager {
    fn default() -> Self {
        Self::new()
    }
}
