// =============================================================================
// Demo Platform - in-process simulated DSP
// =============================================================================
//
// Holds campaigns, creatives and channel budgets in memory, seeded from the
// config.  Every mutating call is applied locally, logged, and appended to an
// action journal so a run can be inspected afterwards.  No request ever
// leaves the process.
// =============================================================================

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use super::CampaignPlatform;
use crate::runtime_config::DemoCampaignSeed;
use crate::types::{Campaign, Creative};

/// A mutation applied to the demo platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlatformAction {
    PauseCreative {
        campaign_id: String,
        creative_id: String,
    },
    ActivateCreative {
        campaign_id: String,
        creative_id: String,
    },
    UpdateBudget {
        campaign_id: String,
        channel: String,
        budget: f64,
    },
}

/// Journal entry: the action and when it was applied.
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    #[serde(flatten)]
    pub action: PlatformAction,
    pub at: String,
}

struct DemoCampaign {
    campaign: Campaign,
    creatives: Vec<Creative>,
    budgets: HashMap<String, f64>,
}

pub struct DemoPlatform {
    /// Insertion order is kept so listings are stable.
    campaigns: RwLock<Vec<DemoCampaign>>,
    journal: RwLock<Vec<JournalEntry>>,
}

impl DemoPlatform {
    pub fn new(seeds: &[DemoCampaignSeed]) -> Self {
        let campaigns = seeds
            .iter()
            .map(|seed| DemoCampaign {
                campaign: Campaign {
                    id: seed.id.clone(),
                    name: seed.name.clone(),
                },
                creatives: seed
                    .creatives
                    .iter()
                    .map(|id| Creative {
                        id: id.clone(),
                        campaign_id: seed.id.clone(),
                        active: true,
                    })
                    .collect(),
                budgets: HashMap::new(),
            })
            .collect();

        Self {
            campaigns: RwLock::new(campaigns),
            journal: RwLock::new(Vec::new()),
        }
    }

    /// Every action applied so far, oldest first.
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.journal.read().clone()
    }

    /// Current budget of a channel, if one was ever set.
    #[cfg(test)]
    pub fn budget(&self, campaign_id: &str, channel: &str) -> Option<f64> {
        self.campaigns
            .read()
            .iter()
            .find(|c| c.campaign.id == campaign_id)
            .and_then(|c| c.budgets.get(channel).copied())
    }

    fn record(&self, action: PlatformAction) {
        self.journal.write().push(JournalEntry {
            action,
            at: Utc::now().to_rfc3339(),
        });
    }

    fn with_campaign<T>(
        &self,
        campaign_id: &str,
        f: impl FnOnce(&mut DemoCampaign) -> Result<T>,
    ) -> Result<T> {
        let mut campaigns = self.campaigns.write();
        match campaigns.iter_mut().find(|c| c.campaign.id == campaign_id) {
            Some(c) => f(c),
            None => bail!("unknown campaign {campaign_id}"),
        }
    }
}

#[async_trait]
impl CampaignPlatform for DemoPlatform {
    async fn active_campaigns(&self) -> Result<Vec<Campaign>> {
        Ok(self
            .campaigns
            .read()
            .iter()
            .map(|c| c.campaign.clone())
            .collect())
    }

    async fn creatives(&self, campaign_id: &str) -> Result<Vec<Creative>> {
        self.with_campaign(campaign_id, |c| Ok(c.creatives.clone()))
    }

    async fn pause_creative(&self, campaign_id: &str, creative_id: &str) -> Result<()> {
        self.with_campaign(campaign_id, |c| {
            match c.creatives.iter_mut().find(|cr| cr.id == creative_id) {
                Some(cr) => {
                    cr.active = false;
                    Ok(())
                }
                None => bail!("creative {creative_id} not in campaign {campaign_id}"),
            }
        })?;
        info!(campaign_id, creative_id, "[DEMO] creative paused");
        self.record(PlatformAction::PauseCreative {
            campaign_id: campaign_id.to_string(),
            creative_id: creative_id.to_string(),
        });
        Ok(())
    }

    async fn activate_creative(&self, campaign_id: &str, creative_id: &str) -> Result<()> {
        self.with_campaign(campaign_id, |c| {
            match c.creatives.iter_mut().find(|cr| cr.id == creative_id) {
                Some(cr) => cr.active = true,
                None => c.creatives.push(Creative {
                    id: creative_id.to_string(),
                    campaign_id: campaign_id.to_string(),
                    active: true,
                }),
            }
            Ok(())
        })?;
        info!(campaign_id, creative_id, "[DEMO] creative activated");
        self.record(PlatformAction::ActivateCreative {
            campaign_id: campaign_id.to_string(),
            creative_id: creative_id.to_string(),
        });
        Ok(())
    }

    async fn update_budget(&self, campaign_id: &str, channel: &str, budget: f64) -> Result<()> {
        if !budget.is_finite() || budget < 0.0 {
            bail!("refusing to set {channel} budget to {budget}");
        }
        self.with_campaign(campaign_id, |c| {
            c.budgets.insert(channel.to_string(), budget);
            Ok(())
        })?;
        info!(campaign_id, channel, budget, "[DEMO] channel budget updated");
        self.record(PlatformAction::UpdateBudget {
            campaign_id: campaign_id.to_string(),
            channel: channel.to_string(),
            budget,
        });
        Ok(())
    }
}
