// =============================================================================
// DSP Bid Agent - Main Entry Point
// =============================================================================
//
// Two modes, selected by AGENT_MODE:
//   - "enhance": enhance one sample bid request, print the decision, exit.
//   - anything else (default): run the optimization loop against the demo
//     platform until Ctrl+C.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod allocation;
mod app_state;
mod bid_engine;
mod campaign;
mod decision;
mod intel;
mod metrics;
mod optimizer;
mod runtime_config;
mod signals;
mod types;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AgentState;
use crate::campaign::{CampaignPlatform, DemoPlatform};
use crate::intel::PreciseClient;
use crate::runtime_config::AgentConfig;
use crate::types::ImpressionRequest;

const DEFAULT_CONFIG_PATH: &str = "agent_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("DSP bid agent starting up");

    let config_path =
        std::env::var("AGENT_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = AgentConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AgentConfig::default()
    });

    if let Ok(url) = std::env::var("PRECISE_API_URL") {
        config.api_base_url = url;
    }

    let api_key = std::env::var("PRECISE_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        warn!("PRECISE_API_KEY not set - intelligence calls will be rejected and signals treated as unavailable");
    }

    info!(
        api_base_url = %config.api_base_url,
        managed_channel = %config.managed_channel,
        campaigns = config.demo_campaigns.len(),
        "Configuration resolved"
    );

    // ── 2. Intelligence client & shared state ────────────────────────────
    let client = PreciseClient::new(
        &api_key,
        config.api_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("building intelligence API client")?;

    let platform = Arc::new(DemoPlatform::new(&config.demo_campaigns));
    let state = Arc::new(AgentState::new(config, Arc::new(client)));

    // ── 3. One-shot bid enhancement ──────────────────────────────────────
    if std::env::var("AGENT_MODE").as_deref() == Ok("enhance") {
        let request = ImpressionRequest::new(
            "imp_123",
            "cr_456",
            vec!["auto_enthusiast".into(), "luxury_shopper".into()],
            "example.com",
            "US-CA",
            2.50,
        )?;
        let decision = state.enhance_bid_request(&request).await;
        println!(
            "{}",
            serde_json::to_string_pretty(&decision).context("serialising bid decision")?
        );
        return Ok(());
    }

    // ── 4. Optimization loop ─────────────────────────────────────────────
    let loop_state = state.clone();
    let loop_platform: Arc<dyn CampaignPlatform> = platform.clone();
    let optimizer_task = tokio::spawn(optimizer::run_continuous_optimization(
        loop_state,
        loop_platform,
    ));

    info!("Optimization loop running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received - stopping");
    optimizer_task.abort();

    info!(
        uptime_secs = state.uptime().as_secs(),
        metrics = ?state.metrics.snapshot(),
        decisions_recorded = state.recent_decisions().len(),
        cached_creatives = state.fetcher.cache().entry_count(),
        platform_actions = platform.journal().len(),
        "Final agent statistics"
    );

    info!("DSP bid agent shut down complete.");
    Ok(())
}
