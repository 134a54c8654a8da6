// =============================================================================
// Central Agent State - DSP Bid Agent
// =============================================================================
//
// Ties the subsystems together behind one `Arc<AgentState>` that both the
// bid path and the optimization loop share.
//
// Thread safety:
//   - Atomic counters in `AgentMetrics`.
//   - parking_lot::RwLock for the decision audit trail.
//   - The config is read-only after startup.
//   - The fatigue cache manages its own interior mutability.
//   No lock is ever held across an `.await`.
// =============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::bid_engine::BidEngine;
use crate::decision::BidDecision;
use crate::intel::IntelligenceApi;
use crate::metrics::AgentMetrics;
use crate::runtime_config::AgentConfig;
use crate::signals::{FatigueCache, SignalFetcher};
use crate::types::ImpressionRequest;

/// Shared state for all agent tasks.
pub struct AgentState {
    // ── Configuration ───────────────────────────────────────────────────
    pub config: AgentConfig,

    // ── Bid path ────────────────────────────────────────────────────────
    pub fetcher: SignalFetcher,
    pub engine: BidEngine,

    // ── Counters ────────────────────────────────────────────────────────
    pub metrics: Arc<AgentMetrics>,

    // ── Decision Audit Trail ────────────────────────────────────────────
    recent_decisions: RwLock<VecDeque<BidDecision>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AgentState {
    /// Build the agent state around an intelligence service implementation.
    pub fn new(config: AgentConfig, api: Arc<dyn IntelligenceApi>) -> Self {
        let metrics = Arc::new(AgentMetrics::new());
        let cache = FatigueCache::new(Duration::from_secs(config.fatigue_cache_ttl_secs));
        let fetcher = SignalFetcher::new(api, cache, metrics.clone(), config.managed_channel.clone());
        let engine = BidEngine::new(config.bid_rules.clone());

        info!(
            cache_ttl_secs = fetcher.cache().ttl().as_secs(),
            fatigue_threshold = engine.rules().fatigue_threshold,
            min_bid_ratio = engine.rules().min_bid_ratio,
            channel = %config.managed_channel,
            "agent state initialised"
        );

        Self {
            config,
            fetcher,
            engine,
            metrics,
            recent_decisions: RwLock::new(VecDeque::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Bid Enhancement ─────────────────────────────────────────────────

    /// Gather all four signals for `request` concurrently, blend them into a
    /// bid decision and record it.  Always produces a decision, even when
    /// every signal is unavailable.
    pub async fn enhance_bid_request(&self, request: &ImpressionRequest) -> BidDecision {
        let signals = self.fetcher.gather(request).await;
        let available = signals.available_count();

        let decision = self.engine.evaluate(request, signals);
        self.metrics.record_bid_enhanced();

        debug!(
            impression_id = %decision.impression_id,
            signals_available = available,
            original_bid = decision.original_bid,
            enhanced_bid = decision.enhanced_bid,
            should_bid = decision.should_bid,
            reasons = ?decision.reasons,
            "bid enhanced"
        );

        self.push_decision(decision.clone());
        decision
    }

    // ── Decision Audit ──────────────────────────────────────────────────

    /// Record a decision. The buffer is capped at `max_recent_decisions`;
    /// oldest entries are evicted first.
    pub fn push_decision(&self, decision: BidDecision) {
        let cap = self.config.max_recent_decisions;
        let mut decisions = self.recent_decisions.write();
        decisions.push_back(decision);
        while decisions.len() > cap {
            decisions.pop_front();
        }
    }

    /// Most recent decisions, newest last.
    pub fn recent_decisions(&self) -> Vec<BidDecision> {
        self.recent_decisions.read().iter().cloned().collect()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeIntel;

    fn state_with(api: FakeIntel) -> (AgentState, Arc<FakeIntel>) {
        let api = Arc::new(api);
        (AgentState::new(AgentConfig::default(), api.clone()), api)
    }

    #[tokio::test]
    async fn enhances_with_partial_signals() {
        let (state, api) = state_with(
            FakeIntel::default()
                .with_incrementality(0.4)
                .with_supply_quality(0.9)
                .with_audience_value(1.0),
        );
        api.set_fatigue("cr_456", 8.0);

        let d = state.enhance_bid_request(&FakeIntel::request(2.50)).await;
        assert!((d.multiplier - 0.56).abs() < 1e-9);
        assert!((d.enhanced_bid - 1.40).abs() < 1e-9);
        assert!(d.should_bid);
        assert_eq!(d.reasons.len(), 2);
        assert_eq!(state.metrics.snapshot().bids_enhanced, 1);
    }

    #[tokio::test]
    async fn every_signal_unavailable_still_yields_a_decision() {
        let (state, _) = state_with(FakeIntel::default());

        let d = state.enhance_bid_request(&FakeIntel::request(2.50)).await;
        assert_eq!(d.multiplier, 1.0);
        assert!((d.enhanced_bid - 2.50).abs() < 1e-9);
        assert!(d.reasons.is_empty());
        assert!(d.should_bid);
        assert_eq!(d.signals.available_count(), 0);
        assert_eq!(state.metrics.snapshot().bids_enhanced, 1);
    }

    #[tokio::test]
    async fn repeated_requests_are_idempotent_and_counted_once_each() {
        let (state, api) = state_with(
            FakeIntel::default()
                .with_incrementality(1.8)
                .with_audience_value(2.4),
        );
        api.set_fatigue("cr_456", 3.0);

        let req = FakeIntel::request(1.75);
        let a = state.enhance_bid_request(&req).await;
        let b = state.enhance_bid_request(&req).await;

        assert_eq!(a.multiplier, b.multiplier);
        assert_eq!(a.enhanced_bid, b.enhanced_bid);
        assert_eq!(a.reasons, b.reasons);
        assert_eq!(a.signals, b.signals);
        assert_eq!(state.metrics.snapshot().bids_enhanced, 2);
        // Second fatigue lookup came from cache.
        assert_eq!(api.fatigue_calls(), 1);
        assert_eq!(state.metrics.snapshot().api_calls_saved, 1);
    }

    #[tokio::test]
    async fn audit_trail_is_bounded() {
        let api = Arc::new(FakeIntel::default());
        let config = AgentConfig {
            max_recent_decisions: 3,
            ..AgentConfig::default()
        };
        let state = AgentState::new(config, api);

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(state.enhance_bid_request(&FakeIntel::request(1.0)).await.id);
        }
        let kept: Vec<String> = state.recent_decisions().into_iter().map(|d| d.id).collect();
        assert_eq!(kept, ids[2..].to_vec());
    }
}
