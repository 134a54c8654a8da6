// =============================================================================
// Shared types used across the DSP bid agent
// =============================================================================

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A single bid opportunity as received from the DSP.
///
/// Read-only for the lifetime of one bid decision.  Deserialisation goes
/// through [`ImpressionRequest::new`], so a decoded request has a valid bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawImpressionRequest")]
pub struct ImpressionRequest {
    pub impression_id: String,
    pub creative_id: String,
    /// Audience segment labels. Order is preserved on the wire but carries no
    /// meaning.
    pub user_segments: Vec<String>,
    pub domain: String,
    pub geo: String,
    /// Bid the DSP would place without enhancement (currency units).
    pub base_bid: f64,
}

impl ImpressionRequest {
    /// Build a request, rejecting non-positive or non-finite base bids.
    pub fn new(
        impression_id: impl Into<String>,
        creative_id: impl Into<String>,
        user_segments: Vec<String>,
        domain: impl Into<String>,
        geo: impl Into<String>,
        base_bid: f64,
    ) -> Result<Self> {
        if !base_bid.is_finite() || base_bid <= 0.0 {
            bail!("base bid must be a positive amount, got {base_bid}");
        }
        Ok(Self {
            impression_id: impression_id.into(),
            creative_id: creative_id.into(),
            user_segments,
            domain: domain.into(),
            geo: geo.into(),
            base_bid,
        })
    }
}

#[derive(Deserialize)]
struct RawImpressionRequest {
    impression_id: String,
    creative_id: String,
    #[serde(default)]
    user_segments: Vec<String>,
    domain: String,
    geo: String,
    base_bid: f64,
}

impl TryFrom<RawImpressionRequest> for ImpressionRequest {
    type Error = anyhow::Error;

    fn try_from(raw: RawImpressionRequest) -> Result<Self> {
        Self::new(
            raw.impression_id,
            raw.creative_id,
            raw.user_segments,
            raw.domain,
            raw.geo,
            raw.base_bid,
        )
    }
}

/// An active campaign on the campaign-management platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A creative attached to a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creative {
    pub id: String,
    #[serde(default)]
    pub campaign_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Replacement suggested by the intelligence service for a fatigued creative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeRecommendation {
    pub variant_id: String,
}
