// =============================================================================
// Precise Intelligence REST Client - bearer-authenticated JSON calls
// =============================================================================
//
// SECURITY: The API key is only ever placed in the Authorization header.  It
// is never logged, and `Debug` for the client omits it.
//
// Every endpoint answers JSON.  Any non-2xx status is turned into an error
// carrying the status and body; payloads are range-checked before they are
// handed back so that a garbled score can never reach the bid engine.
// =============================================================================

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use super::IntelligenceApi;
use crate::allocation::AttributionReport;
use crate::signals::{
    AudienceValueSignal, FatigueSignal, IncrementalitySignal, SupplyQualitySignal,
};
use crate::types::{CreativeRecommendation, ImpressionRequest};

/// HTTP client for the intelligence API.
#[derive(Clone)]
pub struct PreciseClient {
    base_url: Url,
    client: reqwest::Client,
}

impl PreciseClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new client.
    ///
    /// # Arguments
    /// * `api_key`  - bearer credential sent with every request.
    /// * `base_url` - e.g. `https://api.precise.ai/v1`; a trailing `/` is trimmed.
    /// * `timeout`  - per-request timeout.
    pub fn new(api_key: &str, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("API key contains characters not allowed in a header")?;
        auth.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client for PreciseClient")?;

        let base_url = base_url.into();
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid intelligence API base URL {base_url}"))?;
        debug!(base_url = %base_url, "PreciseClient initialised");

        Ok(Self { base_url, client })
    }

    // -------------------------------------------------------------------------
    // Request helpers
    // -------------------------------------------------------------------------

    /// Base URL extended by `segments`, each percent-encoded as a single path
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &serde_json::Value,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let resp = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} request failed", url.path()))?;
        Self::decode(url.path(), resp).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let resp = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {} request failed", url.path()))?;
        Self::decode(url.path(), resp).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("intelligence API {path} returned {status}: {body}");
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("failed to parse {path} response body"))
    }
}

impl std::fmt::Debug for PreciseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreciseClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IntelligenceApi for PreciseClient {
    /// POST /creative/fatigue
    #[instrument(skip(self), name = "precise::creative_fatigue")]
    async fn creative_fatigue(&self, creative_id: &str) -> Result<FatigueSignal> {
        let body = json!({ "creative_id": creative_id, "check_cross_platform": true });
        let signal: FatigueSignal = self.post_json(&["creative", "fatigue"], &body).await?;
        signal.validate()?;
        debug!(fatigue_score = signal.fatigue_score, "creative fatigue fetched");
        Ok(signal)
    }

    /// POST /attribution/incrementality
    #[instrument(skip(self, request), fields(impression_id = %request.impression_id), name = "precise::incrementality")]
    async fn incrementality(
        &self,
        request: &ImpressionRequest,
        channel: &str,
    ) -> Result<IncrementalitySignal> {
        let body = json!({
            "user_segments": request.user_segments,
            "channel": channel,
            "impression_context": {
                "domain": request.domain,
                "geo": request.geo,
            },
        });
        let signal: IncrementalitySignal =
            self.post_json(&["attribution", "incrementality"], &body).await?;
        signal.validate()?;
        Ok(signal)
    }

    /// GET /supply/quality?domain=
    #[instrument(skip(self), name = "precise::supply_quality")]
    async fn supply_quality(&self, domain: &str) -> Result<SupplyQualitySignal> {
        let signal: SupplyQualitySignal = self
            .get_json(&["supply", "quality"], &[("domain", domain)])
            .await?;
        signal.validate()?;
        Ok(signal)
    }

    /// POST /audience/value
    #[instrument(skip(self), name = "precise::audience_value")]
    async fn audience_value(&self, segments: &[String]) -> Result<AudienceValueSignal> {
        let body = json!({ "segments": segments });
        let signal: AudienceValueSignal = self.post_json(&["audience", "value"], &body).await?;
        signal.validate()?;
        Ok(signal)
    }

    /// POST /creative/recommendation
    #[instrument(skip(self), name = "precise::creative_recommendation")]
    async fn creative_recommendation(
        &self,
        campaign_id: &str,
        creative_id: &str,
    ) -> Result<CreativeRecommendation> {
        let body = json!({ "creative_id": creative_id, "campaign_id": campaign_id });
        self.post_json(&["creative", "recommendation"], &body).await
    }

    /// GET /attribution/campaign/{id}
    #[instrument(skip(self), name = "precise::attribution")]
    async fn attribution(&self, campaign_id: &str) -> Result<AttributionReport> {
        self.get_json(&["attribution", "campaign", campaign_id], &[])
            .await
    }
}
