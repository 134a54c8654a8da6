// =============================================================================
// Agent Metrics - process-wide counters with a daily reset
// =============================================================================
//
// Four counters, each bumped once per successful action:
//   - bids_enhanced         one per enhance_bid_request call
//   - creatives_rotated     one per fatigued creative paused
//   - budget_optimizations  one per budget pushed to the platform
//   - api_calls_saved       one per fatigue cache hit
//
// Counters are atomics so any task may bump them without locking.  They are
// zeroed when the UTC date rolls over (checked by the optimization loop).
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

pub struct AgentMetrics {
    bids_enhanced: AtomicU64,
    creatives_rotated: AtomicU64,
    budget_optimizations: AtomicU64,
    api_calls_saved: AtomicU64,
    current_date: RwLock<NaiveDate>,
}

/// Immutable snapshot of the counters, suitable for logging or serialising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub bids_enhanced: u64,
    pub creatives_rotated: u64,
    pub budget_optimizations: u64,
    pub api_calls_saved: u64,
}

impl AgentMetrics {
    pub fn new() -> Self {
        Self::starting_on(Utc::now().date_naive())
    }

    fn starting_on(date: NaiveDate) -> Self {
        Self {
            bids_enhanced: AtomicU64::new(0),
            creatives_rotated: AtomicU64::new(0),
            budget_optimizations: AtomicU64::new(0),
            api_calls_saved: AtomicU64::new(0),
            current_date: RwLock::new(date),
        }
    }

    // -------------------------------------------------------------------------
    // Recording
    // -------------------------------------------------------------------------

    pub fn record_bid_enhanced(&self) {
        self.bids_enhanced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_creative_rotated(&self) {
        self.creatives_rotated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_budget_optimization(&self) {
        self.budget_optimizations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_api_call_saved(&self) {
        self.api_calls_saved.fetch_add(1, Ordering::Relaxed);
    }

    // -------------------------------------------------------------------------
    // Daily reset
    // -------------------------------------------------------------------------

    /// Zero all counters if `now` falls on a later UTC date than the last
    /// reset.  Returns `true` when a reset happened.
    pub fn maybe_reset_daily(&self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        {
            if *self.current_date.read() >= today {
                return false;
            }
        }
        let mut date = self.current_date.write();
        // Another task may have reset while we waited for the write lock.
        if *date >= today {
            return false;
        }
        let old_date = *date;
        info!(
            old_date = %old_date,
            new_date = %today,
            final_counts = ?self.snapshot(),
            "date rolled - resetting daily agent metrics"
        );
        self.reset();
        *date = today;
        true
    }

    #[cfg(test)]
    pub fn set_current_date(&self, date: NaiveDate) {
        *self.current_date.write() = date;
    }

    fn reset(&self) {
        self.bids_enhanced.store(0, Ordering::Relaxed);
        self.creatives_rotated.store(0, Ordering::Relaxed);
        self.budget_optimizations.store(0, Ordering::Relaxed);
        self.api_calls_saved.store(0, Ordering::Relaxed);
    }

    // -------------------------------------------------------------------------
    // Snapshot
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bids_enhanced: self.bids_enhanced.load(Ordering::Relaxed),
            creatives_rotated: self.creatives_rotated.load(Ordering::Relaxed),
            budget_optimizations: self.budget_optimizations.load(Ordering::Relaxed),
            api_calls_saved: self.api_calls_saved.load(Ordering::Relaxed),
        }
    }
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentMetrics")
            .field("counts", &self.snapshot())
            .field("current_date", &*self.current_date.read())
            .finish()
    }
}
