// =============================================================================
// Fatigue Cache - TTL cache of creative fatigue scores
// =============================================================================
//
// Keyed by creative id.  Freshness is checked lazily on read; nothing is ever
// evicted in the background because the key space (creatives of the running
// campaigns) is small.  Entries are replaced wholesale on refresh.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::FatigueSignal;

/// Shared TTL cache for fatigue signals.
pub struct FatigueCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

struct CacheEntry {
    signal: FatigueSignal,
    fetched_at: Instant,
}

impl FatigueCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Return the cached signal for `creative_id` if it is younger than the TTL.
    pub fn get(&self, creative_id: &str) -> Option<FatigueSignal> {
        let entries = self.entries.read();
        let entry = entries.get(creative_id)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.signal.clone())
        } else {
            None
        }
    }

    /// Store a freshly fetched signal, replacing any previous entry.
    pub fn insert(&self, creative_id: impl Into<String>, signal: FatigueSignal) {
        self.entries.write().insert(
            creative_id.into(),
            CacheEntry {
                signal,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Number of entries held, fresh or stale.
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for FatigueCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
