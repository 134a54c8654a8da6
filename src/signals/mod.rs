// =============================================================================
// Signals Module
// =============================================================================
//
// The four independent scores the bid engine consumes:
//
//   1. Creative fatigue      - 0..10, higher = more worn out
//   2. Incrementality        - marginal value ratio, >1 = above-average lift
//   3. Supply-path quality   - 0..1 trust score of the inventory source
//   4. Audience value        - cross-platform value ratio of the segments
//
// Any subset may be missing for a given impression.  A `SignalSnapshot`
// carries whatever was available when a decision was made.

pub mod fatigue_cache;
pub mod fetcher;

pub use fatigue_cache::FatigueCache;
pub use fetcher::SignalFetcher;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Which of the four signals a value or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Fatigue,
    Incrementality,
    SupplyQuality,
    AudienceValue,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fatigue => write!(f, "creative_fatigue"),
            Self::Incrementality => write!(f, "incrementality"),
            Self::SupplyQuality => write!(f, "supply_quality"),
            Self::AudienceValue => write!(f, "audience_value"),
        }
    }
}

/// Creative fatigue as reported by the intelligence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueSignal {
    /// 0..10.
    pub fatigue_score: f64,

    /// Free-text advice the service attaches to fatigued creatives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl FatigueSignal {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=10.0).contains(&self.fatigue_score),
            "fatigue_score {} outside 0..10",
            self.fatigue_score
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalitySignal {
    pub marginal_value: f64,
}

impl IncrementalitySignal {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.marginal_value.is_finite() && self.marginal_value >= 0.0,
            "marginal_value {} is not a non-negative ratio",
            self.marginal_value
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyQualitySignal {
    /// 0.0..1.0.
    pub quality_score: f64,
}

impl SupplyQualitySignal {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.quality_score),
            "quality_score {} outside 0..1",
            self.quality_score
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceValueSignal {
    pub cross_platform_value: f64,
}

impl AudienceValueSignal {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.cross_platform_value.is_finite() && self.cross_platform_value >= 0.0,
            "cross_platform_value {} is not a non-negative ratio",
            self.cross_platform_value
        );
        Ok(())
    }
}

/// The raw signals used for one bid decision. `None` = unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub creative_fatigue: Option<FatigueSignal>,
    pub incrementality: Option<IncrementalitySignal>,
    pub supply_quality: Option<SupplyQualitySignal>,
    pub audience_value: Option<AudienceValueSignal>,
}

impl SignalSnapshot {
    /// Number of signals that were actually available.
    pub fn available_count(&self) -> usize {
        [
            self.creative_fatigue.is_some(),
            self.incrementality.is_some(),
            self.supply_quality.is_some(),
            self.audience_value.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}
