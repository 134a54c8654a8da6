// =============================================================================
// Runtime Configuration - Agent settings loaded at startup
// =============================================================================
//
// Every tunable parameter of the bid agent lives here: intelligence service
// endpoint, cache and loop timings, the bid rule table and the demo campaign
// seed.
//
// The file is read once at startup and never written back; environment
// overrides stay in memory.  All fields carry `#[serde(default)]` so that
// adding new fields never breaks loading an older config file.
//
// The bearer credential is NOT part of this file. It is read from the
// environment at startup and never serialised.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_api_base_url() -> String {
    "https://api.precise.ai/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_fatigue_cache_ttl_secs() -> u64 {
    300
}

fn default_cycle_interval_secs() -> u64 {
    300
}

fn default_error_retry_secs() -> u64 {
    60
}

fn default_rotation_fatigue_threshold() -> f64 {
    8.0
}

fn default_managed_channel() -> String {
    "DV360".to_string()
}

fn default_max_recent_decisions() -> usize {
    100
}

fn default_fatigue_threshold() -> f64 {
    7.0
}

fn default_fatigue_factor() -> f64 {
    0.7
}

fn default_low_incrementality_threshold() -> f64 {
    0.5
}

fn default_low_incrementality_factor() -> f64 {
    0.8
}

fn default_high_incrementality_threshold() -> f64 {
    1.5
}

fn default_high_incrementality_factor() -> f64 {
    1.3
}

fn default_low_supply_quality_threshold() -> f64 {
    0.6
}

fn default_low_supply_quality_factor() -> f64 {
    0.9
}

fn default_high_audience_value_threshold() -> f64 {
    2.0
}

fn default_high_audience_value_factor() -> f64 {
    1.2
}

fn default_min_bid_ratio() -> f64 {
    0.5
}

fn default_confidence() -> f64 {
    0.85
}

fn default_demo_campaigns() -> Vec<DemoCampaignSeed> {
    vec![
        DemoCampaignSeed {
            id: "dv360_bmw_summer".to_string(),
            name: "BMW Summer Drive Event 2025".to_string(),
            creatives: vec![
                "bmw-hero".to_string(),
                "bmw-lifestyle".to_string(),
                "bmw-performance".to_string(),
            ],
        },
        DemoCampaignSeed {
            id: "dv360_nike_airmax".to_string(),
            name: "Nike Air Max Reimagined".to_string(),
            creatives: vec!["nike-hero".to_string(), "nike-motion".to_string()],
        },
    ]
}

// =============================================================================
// BidRules
// =============================================================================

/// Thresholds and multiplicative factors of the bid rule table.
///
/// Each signal contributes at most one factor. Comparisons are strict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRules {
    /// Fatigue score above which the fatigue factor applies.
    #[serde(default = "default_fatigue_threshold")]
    pub fatigue_threshold: f64,
    #[serde(default = "default_fatigue_factor")]
    pub fatigue_factor: f64,

    /// Marginal value below which the low-incrementality factor applies.
    #[serde(default = "default_low_incrementality_threshold")]
    pub low_incrementality_threshold: f64,
    #[serde(default = "default_low_incrementality_factor")]
    pub low_incrementality_factor: f64,

    /// Marginal value above which the high-incrementality factor applies.
    #[serde(default = "default_high_incrementality_threshold")]
    pub high_incrementality_threshold: f64,
    #[serde(default = "default_high_incrementality_factor")]
    pub high_incrementality_factor: f64,

    /// Supply quality below which the low-quality factor applies.
    #[serde(default = "default_low_supply_quality_threshold")]
    pub low_supply_quality_threshold: f64,
    #[serde(default = "default_low_supply_quality_factor")]
    pub low_supply_quality_factor: f64,

    /// Cross-platform audience value above which the high-value factor applies.
    #[serde(default = "default_high_audience_value_threshold")]
    pub high_audience_value_threshold: f64,
    #[serde(default = "default_high_audience_value_factor")]
    pub high_audience_value_factor: f64,

    /// Enhanced bid must exceed `base_bid * min_bid_ratio` to be placed.
    #[serde(default = "default_min_bid_ratio")]
    pub min_bid_ratio: f64,

    /// Confidence attached to every decision. Static for now; not derived
    /// from signal availability.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Default for BidRules {
    fn default() -> Self {
        Self {
            fatigue_threshold: default_fatigue_threshold(),
            fatigue_factor: default_fatigue_factor(),
            low_incrementality_threshold: default_low_incrementality_threshold(),
            low_incrementality_factor: default_low_incrementality_factor(),
            high_incrementality_threshold: default_high_incrementality_threshold(),
            high_incrementality_factor: default_high_incrementality_factor(),
            low_supply_quality_threshold: default_low_supply_quality_threshold(),
            low_supply_quality_factor: default_low_supply_quality_factor(),
            high_audience_value_threshold: default_high_audience_value_threshold(),
            high_audience_value_factor: default_high_audience_value_factor(),
            min_bid_ratio: default_min_bid_ratio(),
            confidence: default_confidence(),
        }
    }
}

// =============================================================================
// DemoCampaignSeed
// =============================================================================

/// A campaign (and its creatives) preloaded into the in-process demo platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoCampaignSeed {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creatives: Vec<String>,
}

// =============================================================================
// AgentConfig
// =============================================================================

/// Top-level configuration for the bid agent.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    // --- Intelligence service ------------------------------------------------

    /// Base URL of the intelligence API (no trailing slash).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout for intelligence API calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long a fetched fatigue score is served from cache.
    #[serde(default = "default_fatigue_cache_ttl_secs")]
    pub fatigue_cache_ttl_secs: u64,

    // --- Optimization loop ---------------------------------------------------

    /// Delay between optimization cycles after a successful cycle.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Delay before retrying after a failed cycle.
    #[serde(default = "default_error_retry_secs")]
    pub error_retry_secs: u64,

    /// Creatives whose fatigue score exceeds this are rotated out.
    #[serde(default = "default_rotation_fatigue_threshold")]
    pub rotation_fatigue_threshold: f64,

    /// Channel whose budget this agent is allowed to update.
    #[serde(default = "default_managed_channel")]
    pub managed_channel: String,

    // --- Bid engine ----------------------------------------------------------

    #[serde(default)]
    pub bid_rules: BidRules,

    /// Size of the in-memory audit trail of recent bid decisions.
    #[serde(default = "default_max_recent_decisions")]
    pub max_recent_decisions: usize,

    // --- Demo platform -------------------------------------------------------

    #[serde(default = "default_demo_campaigns")]
    pub demo_campaigns: Vec<DemoCampaignSeed>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            fatigue_cache_ttl_secs: default_fatigue_cache_ttl_secs(),
            cycle_interval_secs: default_cycle_interval_secs(),
            error_retry_secs: default_error_retry_secs(),
            rotation_fatigue_threshold: default_rotation_fatigue_threshold(),
            managed_channel: default_managed_channel(),
            bid_rules: BidRules::default(),
            max_recent_decisions: default_max_recent_decisions(),
            demo_campaigns: default_demo_campaigns(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read agent config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse agent config from {}", path.display()))?;

        info!(
            path = %path.display(),
            api_base_url = %config.api_base_url,
            managed_channel = %config.managed_channel,
            "agent config loaded"
        );

        Ok(config)
    }
}
