// =============================================================================
// Campaign Platform
// =============================================================================
//
// The five campaign-management operations the optimization loop needs from
// a DSP.  Implementations own their failure modes; the loop logs and
// isolates every error they return.

pub mod demo;

pub use demo::DemoPlatform;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Campaign, Creative};

#[async_trait]
pub trait CampaignPlatform: Send + Sync {
    /// Campaigns currently delivering.
    async fn active_campaigns(&self) -> Result<Vec<Campaign>>;

    /// All creatives attached to a campaign, active or paused.
    async fn creatives(&self, campaign_id: &str) -> Result<Vec<Creative>>;

    async fn pause_creative(&self, campaign_id: &str, creative_id: &str) -> Result<()>;

    /// Activate a creative, attaching it to the campaign if it is new.
    async fn activate_creative(&self, campaign_id: &str, creative_id: &str) -> Result<()>;

    /// Set the budget of `channel` for a campaign.
    async fn update_budget(&self, campaign_id: &str, channel: &str, budget: f64) -> Result<()>;
}
