// =============================================================================
// In-memory intelligence service for tests
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::allocation::AttributionReport;
use crate::intel::IntelligenceApi;
use crate::signals::{
    AudienceValueSignal, FatigueSignal, IncrementalitySignal, SupplyQualitySignal,
};
use crate::types::{CreativeRecommendation, ImpressionRequest};

/// Answers from fixed values; anything unset fails like an unreachable
/// endpoint would.  Every call first waits `latency` (zero by default).
#[derive(Default)]
pub struct FakeIntel {
    fatigue: Mutex<HashMap<String, f64>>,
    marginal_value: Option<f64>,
    quality_score: Option<f64>,
    cross_platform_value: Option<f64>,
    recommendation: Option<String>,
    attribution: HashMap<String, AttributionReport>,
    latency: Duration,

    fatigue_calls: AtomicU64,
    recommendation_calls: AtomicU64,
    last_channel: Mutex<Option<String>>,
}

impl FakeIntel {
    pub fn with_incrementality(mut self, marginal_value: f64) -> Self {
        self.marginal_value = Some(marginal_value);
        self
    }

    pub fn with_supply_quality(mut self, quality_score: f64) -> Self {
        self.quality_score = Some(quality_score);
        self
    }

    pub fn with_audience_value(mut self, cross_platform_value: f64) -> Self {
        self.cross_platform_value = Some(cross_platform_value);
        self
    }

    pub fn with_recommendation(mut self, variant_id: &str) -> Self {
        self.recommendation = Some(variant_id.to_string());
        self
    }

    pub fn with_attribution(mut self, campaign_id: &str, report: AttributionReport) -> Self {
        self.attribution.insert(campaign_id.to_string(), report);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_fatigue(&self, creative_id: &str, score: f64) {
        self.fatigue.lock().insert(creative_id.to_string(), score);
    }

    pub fn fatigue_calls(&self) -> u64 {
        self.fatigue_calls.load(Ordering::SeqCst)
    }

    pub fn recommendation_calls(&self) -> u64 {
        self.recommendation_calls.load(Ordering::SeqCst)
    }

    pub fn last_channel(&self) -> Option<String> {
        self.last_channel.lock().clone()
    }

    async fn respond(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// The impression used throughout the tests: creative `cr_456`.
    pub fn request(base_bid: f64) -> ImpressionRequest {
        ImpressionRequest::new(
            "imp_123",
            "cr_456",
            vec!["auto_enthusiast".into(), "luxury_shopper".into()],
            "example.com",
            "US-CA",
            base_bid,
        )
        .unwrap()
    }
}

#[async_trait]
impl IntelligenceApi for FakeIntel {
    async fn creative_fatigue(&self, creative_id: &str) -> Result<FatigueSignal> {
        self.respond().await;
        self.fatigue_calls.fetch_add(1, Ordering::SeqCst);
        let score = self
            .fatigue
            .lock()
            .get(creative_id)
            .copied()
            .ok_or_else(|| anyhow!("no fatigue data for {creative_id}"))?;
        Ok(FatigueSignal {
            fatigue_score: score,
            recommendation: None,
        })
    }

    async fn incrementality(
        &self,
        _request: &ImpressionRequest,
        channel: &str,
    ) -> Result<IncrementalitySignal> {
        self.respond().await;
        *self.last_channel.lock() = Some(channel.to_string());
        let marginal_value = self
            .marginal_value
            .ok_or_else(|| anyhow!("incrementality endpoint unavailable"))?;
        Ok(IncrementalitySignal { marginal_value })
    }

    async fn supply_quality(&self, _domain: &str) -> Result<SupplyQualitySignal> {
        self.respond().await;
        let quality_score = self
            .quality_score
            .ok_or_else(|| anyhow!("supply quality endpoint unavailable"))?;
        Ok(SupplyQualitySignal { quality_score })
    }

    async fn audience_value(&self, _segments: &[String]) -> Result<AudienceValueSignal> {
        self.respond().await;
        let cross_platform_value = self
            .cross_platform_value
            .ok_or_else(|| anyhow!("audience value endpoint unavailable"))?;
        Ok(AudienceValueSignal { cross_platform_value })
    }

    async fn creative_recommendation(
        &self,
        _campaign_id: &str,
        _creative_id: &str,
    ) -> Result<CreativeRecommendation> {
        self.respond().await;
        self.recommendation_calls.fetch_add(1, Ordering::SeqCst);
        let variant_id = self
            .recommendation
            .clone()
            .ok_or_else(|| anyhow!("no recommendation available"))?;
        Ok(CreativeRecommendation { variant_id })
    }

    async fn attribution(&self, campaign_id: &str) -> Result<AttributionReport> {
        self.respond().await;
        self.attribution
            .get(campaign_id)
            .cloned()
            .ok_or_else(|| anyhow!("no attribution for {campaign_id}"))
    }
}
