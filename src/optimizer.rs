// =============================================================================
// Optimization Loop - Periodic creative rotation + budget reallocation
// =============================================================================
//
// Runs as a background Tokio task.  Each cycle:
//   1. Lists active campaigns from the platform.
//   2. For every campaign, concurrently:
//        a. rotates out creatives whose fatigue exceeds the rotation
//           threshold (pause, ask for a replacement, activate it);
//        b. recomputes the channel budget split from attribution data and
//           pushes the managed channel's budget.
//   3. Logs the metrics snapshot.
//
// A cycle that fails to list campaigns is retried after the short error
// delay; otherwise the next cycle starts after the regular interval.  The
// daily metrics reset is applied after every cycle, failed or not.  The
// loop never returns:
//
//   tokio::spawn(run_continuous_optimization(state, platform));
//
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::future::join_all;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::allocation::calculate_optimal_allocation;
use crate::app_state::AgentState;
use crate::campaign::CampaignPlatform;

/// What one cycle accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub campaigns: usize,
    pub creatives_rotated: u64,
    pub budgets_updated: u64,
}

/// Pause every creative of `campaign_id` whose fatigue exceeds the rotation
/// threshold and activate the recommended replacement.  Returns how many
/// creatives were rotated out.
pub async fn auto_rotate_creatives(
    state: &AgentState,
    platform: &dyn CampaignPlatform,
    campaign_id: &str,
) -> Result<u64> {
    info!(campaign_id, "checking creatives for fatigue");
    let threshold = state.config.rotation_fatigue_threshold;

    let creatives = platform
        .creatives(campaign_id)
        .await
        .with_context(|| format!("listing creatives for campaign {campaign_id}"))?;

    let mut rotated = 0;
    for creative in creatives.iter().filter(|c| c.active) {
        let Some(fatigue) = state.fetcher.creative_fatigue(&creative.id).await else {
            continue;
        };
        if fatigue.fatigue_score <= threshold {
            continue;
        }

        warn!(
            campaign_id,
            creative_id = %creative.id,
            fatigue_score = fatigue.fatigue_score,
            "creative is fatigued - rotating"
        );

        if let Err(e) = platform.pause_creative(campaign_id, &creative.id).await {
            error!(campaign_id, creative_id = %creative.id, error = %e, "failed to pause fatigued creative");
            continue;
        }

        if let Some(rec) = state
            .fetcher
            .creative_recommendation(campaign_id, &creative.id)
            .await
        {
            info!(campaign_id, variant_id = %rec.variant_id, "activating recommended creative variant");
            if let Err(e) = platform.activate_creative(campaign_id, &rec.variant_id).await {
                error!(campaign_id, variant_id = %rec.variant_id, error = %e, "failed to activate creative variant");
            }
        }

        state.metrics.record_creative_rotated();
        rotated += 1;
    }

    Ok(rotated)
}

/// Re-split the campaign budget by attribution and push the managed
/// channel's share.  Returns `true` when a budget was updated.
pub async fn optimize_budget_allocation(
    state: &AgentState,
    platform: &dyn CampaignPlatform,
    campaign_id: &str,
) -> Result<bool> {
    let Some(attribution) = state.fetcher.attribution(campaign_id).await else {
        return Ok(false);
    };

    let allocation = calculate_optimal_allocation(&attribution);
    let channel = state.config.managed_channel.clone();

    let Some(&budget) = allocation.get(&channel) else {
        info!(campaign_id, channel = %channel, "no allocation for managed channel");
        return Ok(false);
    };

    platform
        .update_budget(campaign_id, &channel, budget)
        .await
        .with_context(|| format!("updating {channel} budget for campaign {campaign_id}"))?;

    info!(campaign_id, channel = %channel, budget = %format!("{budget:.2}"), "updated channel budget");
    state.metrics.record_budget_optimization();
    Ok(true)
}

/// Run one optimization cycle over every active campaign.
pub async fn run_cycle(state: &AgentState, platform: &dyn CampaignPlatform) -> Result<CycleSummary> {
    let campaigns = platform
        .active_campaigns()
        .await
        .context("listing active campaigns")?;

    let per_campaign = campaigns.iter().map(|campaign| async move {
        let id = campaign.id.as_str();
        let (rotation, budget) = tokio::join!(
            auto_rotate_creatives(state, platform, id),
            optimize_budget_allocation(state, platform, id),
        );

        let rotated = rotation.unwrap_or_else(|e| {
            error!(campaign_id = id, error = %e, "creative rotation failed");
            0
        });
        let budget_updated = budget.unwrap_or_else(|e| {
            error!(campaign_id = id, error = %e, "budget optimization failed");
            false
        });
        (rotated, budget_updated)
    });

    let results = join_all(per_campaign).await;

    let summary = CycleSummary {
        campaigns: campaigns.len(),
        creatives_rotated: results.iter().map(|(r, _)| r).sum(),
        budgets_updated: results.iter().filter(|(_, b)| *b).count() as u64,
    };

    info!(
        campaigns = summary.campaigns,
        creatives_rotated = summary.creatives_rotated,
        budgets_updated = summary.budgets_updated,
        metrics = ?state.metrics.snapshot(),
        "optimization cycle complete"
    );

    Ok(summary)
}

/// Run optimization cycles forever.  Should be spawned as a background task;
/// the only way out is cancelling that task.
pub async fn run_continuous_optimization(
    state: Arc<AgentState>,
    platform: Arc<dyn CampaignPlatform>,
) {
    info!("starting continuous optimization loop");

    loop {
        let delay = match run_cycle(&state, platform.as_ref()).await {
            Ok(_) => state.config.cycle_interval_secs,
            Err(e) => {
                let retry = state.config.error_retry_secs;
                error!(error = %format!("{e:#}"), retry_in_secs = retry, "optimization cycle failed");
                retry
            }
        };
        state.metrics.maybe_reset_daily(Utc::now());
        sleep(Duration::from_secs(delay)).await;
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{AttributionReport, ChannelAttribution};
    use crate::campaign::demo::PlatformAction;
    use crate::campaign::DemoPlatform;
    use crate::runtime_config::{AgentConfig, DemoCampaignSeed};
    use crate::test_support::FakeIntel;
    use crate::types::{Campaign, Creative};
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn seed() -> Vec<DemoCampaignSeed> {
        vec![DemoCampaignSeed {
            id: "c1".into(),
            name: "Campaign One".into(),
            creatives: vec!["cr_tired".into(), "cr_fresh".into()],
        }]
    }

    fn report() -> AttributionReport {
        AttributionReport {
            total_budget: Some(1000.0),
            channels: vec![
                ChannelAttribution {
                    channel: "DV360".into(),
                    spend: 100.0,
                    attributed_revenue: 300.0,
                    current_budget: 500.0,
                },
                ChannelAttribution {
                    channel: "Meta".into(),
                    spend: 100.0,
                    attributed_revenue: 100.0,
                    current_budget: 500.0,
                },
            ],
        }
    }

    fn setup(api: FakeIntel) -> (Arc<AgentState>, Arc<FakeIntel>, Arc<DemoPlatform>) {
        let api = Arc::new(api);
        let state = Arc::new(AgentState::new(AgentConfig::default(), api.clone()));
        (state, api, Arc::new(DemoPlatform::new(&seed())))
    }

    #[tokio::test]
    async fn fatigued_creative_is_paused_and_replaced() {
        let (state, api, platform) = setup(FakeIntel::default().with_recommendation("cr_tired_v2"));
        api.set_fatigue("cr_tired", 9.0);
        api.set_fatigue("cr_fresh", 2.0);

        let rotated = auto_rotate_creatives(&state, platform.as_ref(), "c1").await.unwrap();

        assert_eq!(rotated, 1);
        assert_eq!(state.metrics.snapshot().creatives_rotated, 1);
        assert_eq!(api.recommendation_calls(), 1);
        let actions: Vec<_> = platform.journal().into_iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                PlatformAction::PauseCreative {
                    campaign_id: "c1".into(),
                    creative_id: "cr_tired".into()
                },
                PlatformAction::ActivateCreative {
                    campaign_id: "c1".into(),
                    creative_id: "cr_tired_v2".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn rotation_uses_stricter_threshold_than_bidding() {
        let (state, api, platform) = setup(FakeIntel::default().with_recommendation("v2"));
        // Above the bid penalty threshold (7) but not above rotation (8).
        api.set_fatigue("cr_tired", 8.0);
        api.set_fatigue("cr_fresh", 7.5);

        let rotated = auto_rotate_creatives(&state, platform.as_ref(), "c1").await.unwrap();
        assert_eq!(rotated, 0);
        assert!(platform.journal().is_empty());
        assert_eq!(api.recommendation_calls(), 0);
    }

    #[tokio::test]
    async fn rotation_without_recommendation_still_pauses() {
        let (state, api, platform) = setup(FakeIntel::default());
        api.set_fatigue("cr_tired", 9.5);

        let rotated = auto_rotate_creatives(&state, platform.as_ref(), "c1").await.unwrap();
        assert_eq!(rotated, 1);
        assert_eq!(platform.journal().len(), 1);
        // Unknown fatigue for cr_fresh is simply skipped.
        assert!(platform.creatives("c1").await.unwrap()[1].active);
    }

    #[tokio::test]
    async fn budget_for_managed_channel_is_pushed() {
        let (state, _, platform) = setup(FakeIntel::default().with_attribution("c1", report()));

        let updated = optimize_budget_allocation(&state, platform.as_ref(), "c1").await.unwrap();
        assert!(updated);
        assert_eq!(platform.budget("c1", "DV360"), Some(750.0));
        assert_eq!(platform.budget("c1", "Meta"), None);
        assert_eq!(state.metrics.snapshot().budget_optimizations, 1);
    }

    #[tokio::test]
    async fn missing_attribution_skips_budget_update() {
        let (state, _, platform) = setup(FakeIntel::default());

        let updated = optimize_budget_allocation(&state, platform.as_ref(), "c1").await.unwrap();
        assert!(!updated);
        assert!(platform.journal().is_empty());
        assert_eq!(state.metrics.snapshot().budget_optimizations, 0);
    }

    #[tokio::test]
    async fn cycle_runs_both_optimizations_per_campaign() {
        let (state, api, platform) = setup(
            FakeIntel::default()
                .with_recommendation("cr_tired_v2")
                .with_attribution("c1", report()),
        );
        api.set_fatigue("cr_tired", 9.0);

        let summary = run_cycle(&state, platform.as_ref()).await.unwrap();
        assert_eq!(
            summary,
            CycleSummary {
                campaigns: 1,
                creatives_rotated: 1,
                budgets_updated: 1,
            }
        );
    }

    // ── Loop timing ─────────────────────────────────────────────────────

    /// Fails to list campaigns for the first `failures` calls, then reports
    /// none.
    struct FlakyPlatform {
        list_calls: AtomicU64,
        failures: u64,
    }

    impl FlakyPlatform {
        fn failing_first(failures: u64) -> Self {
            Self {
                list_calls: AtomicU64::new(0),
                failures,
            }
        }
    }

    #[async_trait]
    impl CampaignPlatform for FlakyPlatform {
        async fn active_campaigns(&self) -> Result<Vec<Campaign>> {
            if self.list_calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                bail!("platform unavailable");
            }
            Ok(Vec::new())
        }
        async fn creatives(&self, _campaign_id: &str) -> Result<Vec<Creative>> {
            Ok(Vec::new())
        }
        async fn pause_creative(&self, _campaign_id: &str, _creative_id: &str) -> Result<()> {
            Ok(())
        }
        async fn activate_creative(&self, _campaign_id: &str, _creative_id: &str) -> Result<()> {
            Ok(())
        }
        async fn update_budget(&self, _campaign_id: &str, _channel: &str, _budget: f64) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loop_retries_quickly_after_failure_then_uses_regular_interval() {
        let state = Arc::new(AgentState::new(
            AgentConfig::default(),
            Arc::new(FakeIntel::default()),
        ));
        let platform = Arc::new(FlakyPlatform::failing_first(1));

        let handle = tokio::spawn(run_continuous_optimization(state, platform.clone()));

        sleep(Duration::from_secs(1)).await;
        assert_eq!(platform.list_calls.load(Ordering::SeqCst), 1);

        // Failed cycle: retried after 60s.
        sleep(Duration::from_secs(60)).await;
        assert_eq!(platform.list_calls.load(Ordering::SeqCst), 2);

        // Successful cycle: next one only after 300s.
        sleep(Duration::from_secs(250)).await;
        assert_eq!(platform.list_calls.load(Ordering::SeqCst), 2);
        sleep(Duration::from_secs(60)).await;
        assert_eq!(platform.list_calls.load(Ordering::SeqCst), 3);

        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn daily_reset_happens_while_platform_is_down() {
        let state = Arc::new(AgentState::new(
            AgentConfig::default(),
            Arc::new(FakeIntel::default()),
        ));
        let yesterday = Utc::now().date_naive().pred_opt().unwrap();
        state.metrics.set_current_date(yesterday);
        for _ in 0..5 {
            state.metrics.record_bid_enhanced();
        }
        let platform = Arc::new(FlakyPlatform::failing_first(u64::MAX));

        let handle = tokio::spawn(run_continuous_optimization(state.clone(), platform.clone()));
        sleep(Duration::from_secs(600)).await;

        assert!(platform.list_calls.load(Ordering::SeqCst) >= 10);
        assert_eq!(state.metrics.snapshot().bids_enhanced, 0);
        handle.abort();
    }

    // ── Concurrency ─────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn campaigns_are_optimized_concurrently() {
        let seeds = vec![
            DemoCampaignSeed {
                id: "c1".into(),
                name: "Campaign One".into(),
                creatives: vec!["cr_a".into()],
            },
            DemoCampaignSeed {
                id: "c2".into(),
                name: "Campaign Two".into(),
                creatives: vec!["cr_b".into()],
            },
        ];
        let api = Arc::new(
            FakeIntel::default()
                .with_attribution("c1", report())
                .with_attribution("c2", report())
                .with_latency(Duration::from_millis(100)),
        );
        api.set_fatigue("cr_a", 2.0);
        api.set_fatigue("cr_b", 2.0);
        let state = AgentState::new(AgentConfig::default(), api);
        let platform = DemoPlatform::new(&seeds);

        let started = tokio::time::Instant::now();
        let summary = run_cycle(&state, &platform).await.unwrap();
        let elapsed = started.elapsed();

        // Two campaigns, each with a fatigue lookup and an attribution fetch,
        // finish in a single round trip.
        assert_eq!(summary.campaigns, 2);
        assert_eq!(summary.budgets_updated, 2);
        assert_eq!(summary.creatives_rotated, 0);
        assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(200), "elapsed {elapsed:?}");
    }
}
