// =============================================================================
// Budget Allocation - ROAS-proportional split of a campaign budget
// =============================================================================
//
// Input is the attribution report the intelligence service returns per
// campaign.  Each channel's weight is its return on ad spend
// (attributed_revenue / spend); the campaign's total budget is split in
// proportion to those weights.
//
//   total   = report.total_budget, else Σ current_budget
//   weight  = revenue / spend   (0 when spend <= 0)
//   budget  = total * weight / Σ weight, rounded to cents
//
// No allocation is produced when nothing has a positive weight or the total
// is not positive; the caller leaves budgets untouched in that case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribution data for one channel of a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAttribution {
    pub channel: String,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub attributed_revenue: f64,
    #[serde(default)]
    pub current_budget: f64,
}

impl ChannelAttribution {
    /// Return on ad spend; zero for channels without spend.
    pub fn roas(&self) -> f64 {
        if self.spend > 0.0 && self.attributed_revenue.is_finite() {
            (self.attributed_revenue / self.spend).max(0.0)
        } else {
            0.0
        }
    }
}

/// Attribution data for a whole campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributionReport {
    #[serde(default)]
    pub total_budget: Option<f64>,
    #[serde(default)]
    pub channels: Vec<ChannelAttribution>,
}

/// Split the campaign budget across channels by ROAS.
///
/// Returns an empty map when no sensible allocation exists.
pub fn calculate_optimal_allocation(report: &AttributionReport) -> BTreeMap<String, f64> {
    let total = report
        .total_budget
        .unwrap_or_else(|| report.channels.iter().map(|c| c.current_budget).sum());
    if !total.is_finite() || total <= 0.0 {
        return BTreeMap::new();
    }

    let weights: Vec<(&str, f64)> = report
        .channels
        .iter()
        .map(|c| (c.channel.as_str(), c.roas()))
        .collect();
    let weight_sum: f64 = weights.iter().map(|(_, w)| w).sum();
    if weight_sum <= 0.0 {
        return BTreeMap::new();
    }

    weights
        .into_iter()
        .map(|(channel, w)| (channel.to_string(), round_cents(total * w / weight_sum)))
        .collect()
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
