// =============================================================================
// Signal Fetcher - failure-isolating accessors over the intelligence API
// =============================================================================
//
// Every accessor returns `Option`: a transport error, non-success status or
// malformed payload is logged at error level and becomes `None`.  Nothing
// here ever returns an error to the caller, so a single flaky endpoint can
// only remove its own signal from a bid decision.
//
// The fatigue accessor goes through a TTL cache first; a hit bumps the
// `api_calls_saved` counter instead of calling out.
// =============================================================================

use std::sync::Arc;

use tracing::{debug, error};

use super::{
    AudienceValueSignal, FatigueCache, FatigueSignal, IncrementalitySignal, SignalKind,
    SignalSnapshot, SupplyQualitySignal,
};
use crate::allocation::AttributionReport;
use crate::intel::IntelligenceApi;
use crate::metrics::AgentMetrics;
use crate::types::{CreativeRecommendation, ImpressionRequest};

pub struct SignalFetcher {
    api: Arc<dyn IntelligenceApi>,
    cache: FatigueCache,
    metrics: Arc<AgentMetrics>,
    /// Channel name reported to the incrementality endpoint.
    channel: String,
}

impl SignalFetcher {
    pub fn new(
        api: Arc<dyn IntelligenceApi>,
        cache: FatigueCache,
        metrics: Arc<AgentMetrics>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            api,
            cache,
            metrics,
            channel: channel.into(),
        }
    }

    pub fn cache(&self) -> &FatigueCache {
        &self.cache
    }

    // -------------------------------------------------------------------------
    // Individual signals
    // -------------------------------------------------------------------------

    /// Creative fatigue, served from cache while fresh.
    pub async fn creative_fatigue(&self, creative_id: &str) -> Option<FatigueSignal> {
        if let Some(cached) = self.cache.get(creative_id) {
            self.metrics.record_api_call_saved();
            debug!(creative_id, "fatigue cache hit");
            return Some(cached);
        }

        match self.api.creative_fatigue(creative_id).await {
            Ok(signal) => {
                self.cache.insert(creative_id, signal.clone());
                Some(signal)
            }
            Err(e) => {
                error!(signal = %SignalKind::Fatigue, creative_id, error = %e, "failed to check creative fatigue");
                None
            }
        }
    }

    pub async fn incrementality(&self, request: &ImpressionRequest) -> Option<IncrementalitySignal> {
        self.api
            .incrementality(request, &self.channel)
            .await
            .map_err(|e| {
                error!(
                    signal = %SignalKind::Incrementality,
                    impression_id = %request.impression_id,
                    error = %e,
                    "failed to get incrementality score"
                )
            })
            .ok()
    }

    pub async fn supply_quality(&self, domain: &str) -> Option<SupplyQualitySignal> {
        self.api
            .supply_quality(domain)
            .await
            .map_err(|e| {
                error!(signal = %SignalKind::SupplyQuality, domain, error = %e, "failed to check supply quality")
            })
            .ok()
    }

    pub async fn audience_value(&self, segments: &[String]) -> Option<AudienceValueSignal> {
        self.api
            .audience_value(segments)
            .await
            .map_err(|e| {
                error!(
                    signal = %SignalKind::AudienceValue,
                    segments = ?segments,
                    error = %e,
                    "failed to get audience value"
                )
            })
            .ok()
    }

    /// Fetch all four signals for an impression concurrently and wait for all
    /// of them, successful or not.
    pub async fn gather(&self, request: &ImpressionRequest) -> SignalSnapshot {
        let (creative_fatigue, incrementality, supply_quality, audience_value) = tokio::join!(
            self.creative_fatigue(&request.creative_id),
            self.incrementality(request),
            self.supply_quality(&request.domain),
            self.audience_value(&request.user_segments),
        );

        SignalSnapshot {
            creative_fatigue,
            incrementality,
            supply_quality,
            audience_value,
        }
    }

    // -------------------------------------------------------------------------
    // Optimization inputs
    // -------------------------------------------------------------------------

    pub async fn creative_recommendation(
        &self,
        campaign_id: &str,
        creative_id: &str,
    ) -> Option<CreativeRecommendation> {
        self.api
            .creative_recommendation(campaign_id, creative_id)
            .await
            .map_err(|e| {
                error!(campaign_id, creative_id, error = %e, "failed to get creative recommendation")
            })
            .ok()
    }

    pub async fn attribution(&self, campaign_id: &str) -> Option<AttributionReport> {
        self.api
            .attribution(campaign_id)
            .await
            .map_err(|e| error!(campaign_id, error = %e, "failed to get attribution data"))
            .ok()
    }
}
