// =============================================================================
// Intelligence Service
// =============================================================================
//
// Everything the agent asks of the external intelligence API, behind one
// trait so that the fetchers and the optimization loop do not care whether
// they talk to the real HTTP service or to an in-memory fake.
//
// Implementations return errors freely; turning failures into "signal
// unavailable" is the fetcher's job.

pub mod client;

pub use client::PreciseClient;

use anyhow::Result;
use async_trait::async_trait;

use crate::allocation::AttributionReport;
use crate::signals::{
    AudienceValueSignal, FatigueSignal, IncrementalitySignal, SupplyQualitySignal,
};
use crate::types::{CreativeRecommendation, ImpressionRequest};

#[async_trait]
pub trait IntelligenceApi: Send + Sync {
    /// Cross-platform fatigue of a single creative.
    async fn creative_fatigue(&self, creative_id: &str) -> Result<FatigueSignal>;

    /// Incrementality of showing an ad on `channel` in this impression's context.
    async fn incrementality(
        &self,
        request: &ImpressionRequest,
        channel: &str,
    ) -> Result<IncrementalitySignal>;

    /// Supply-path quality of a publisher domain.
    async fn supply_quality(&self, domain: &str) -> Result<SupplyQualitySignal>;

    /// Cross-platform value of a set of audience segments.
    async fn audience_value(&self, segments: &[String]) -> Result<AudienceValueSignal>;

    /// Replacement variant for a fatigued creative.
    async fn creative_recommendation(
        &self,
        campaign_id: &str,
        creative_id: &str,
    ) -> Result<CreativeRecommendation>;

    /// Per-channel attribution data for a campaign.
    async fn attribution(&self, campaign_id: &str) -> Result<AttributionReport>;
}
