use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::MetricsSourceSettings;
use crate::error::AppError;
use crate::models::{ProtocolMetrics, TvlSample};
use crate::utils::{retry_with_backoff, with_timeout, MinIntervalRateLimiter, RetryConfig};

/// Upstream provider of protocol metrics and TVL history.
///
/// Implementations may return partial or empty data; callers tolerate both.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch_protocol_universe(&self) -> Result<Vec<ProtocolMetrics>, AppError>;

    async fn fetch_tvl_history(&self, protocol_slug: &str) -> Result<Vec<TvlSample>, AppError>;
}

/// `/protocols` entry. Everything but the name is optional upstream.
#[derive(Debug, Deserialize)]
struct LlamaProtocol {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    chain: Option<String>,
    #[serde(default)]
    chains: Option<Vec<String>>,
    #[serde(default)]
    tvl: Option<f64>,
    #[serde(default)]
    change_7d: Option<f64>,
    #[serde(default, rename = "listedAt")]
    listed_at: Option<f64>,
    #[serde(default)]
    audits: Value,
    #[serde(default)]
    audit_links: Option<Vec<String>>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// `/protocol/{slug}` response; only the TVL series is read.
#[derive(Debug, Deserialize)]
struct LlamaProtocolDetail {
    #[serde(default)]
    tvl: Option<Vec<LlamaTvlPoint>>,
}

#[derive(Debug, Deserialize)]
struct LlamaTvlPoint {
    #[serde(default)]
    date: Option<f64>,
    #[serde(default, rename = "totalLiquidityUSD")]
    total_liquidity_usd: Option<f64>,
}

fn value_as_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl LlamaProtocol {
    fn into_metrics(self) -> Option<ProtocolMetrics> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        let id = value_as_string(self.id).unwrap_or_else(|| name.clone());

        let mut metrics = ProtocolMetrics::new(id, name, self.tvl.unwrap_or(0.0));
        metrics.slug = self.slug;
        metrics.chain = self.chain;
        metrics.chains = self.chains.unwrap_or_default();
        metrics.change_7d = self.change_7d;
        metrics.listed_at = self.listed_at.filter(|t| t.is_finite()).map(|t| t as i64);
        metrics.audits = value_as_string(self.audits);
        metrics.audit_links = self.audit_links.unwrap_or_default();
        metrics.category = self.category;
        metrics.logo_url = self.logo;
        metrics.website = self.url;
        Some(metrics)
    }
}

impl LlamaTvlPoint {
    fn into_sample(self) -> Option<TvlSample> {
        let date = self.date.filter(|d| d.is_finite())?;
        let tvl = self.total_liquidity_usd.filter(|v| v.is_finite())?;
        Some(TvlSample::new(date as i64, tvl))
    }
}

/// DeFiLlama HTTP client.
///
/// Every request waits on the shared rate limiter first, so the same limiter
/// must be handed to every client talking to the same upstream.
pub struct DefiLlamaClient {
    client: Client,
    base_url: Url,
    rate_limiter: Arc<MinIntervalRateLimiter>,
    request_timeout: Duration,
    retry: RetryConfig,
}

impl DefiLlamaClient {
    pub fn new(
        settings: &MetricsSourceSettings,
        rate_limiter: Arc<MinIntervalRateLimiter>,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid DEFILLAMA_BASE_URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::ConfigError(format!(
                "DEFILLAMA_BASE_URL cannot be used as a base: {}",
                settings.base_url
            )));
        }

        let client = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent("defi-protocol-scores/0.1")
            .build()
            .map_err(|e| AppError::ExternalApiError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            rate_limiter,
            request_timeout: settings.request_timeout(),
            retry: RetryConfig::metrics_api(settings.retry_attempts),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError("Metrics source URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_once<T: DeserializeOwned>(&self, url: Url) -> Result<T, AppError> {
        self.rate_limiter.acquire().await;
        debug!(url = %url, "Requesting metrics source");

        let request = async {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(AppError::NotFound(format!("{} returned HTTP {}", url.path(), status)));
            }
            if !status.is_success() {
                return Err(AppError::ExternalApiError(format!(
                    "{} returned HTTP {}",
                    url.path(),
                    status
                )));
            }
            Ok(response.json::<T>().await?)
        };

        with_timeout(request, self.request_timeout, url.path()).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, operation: &str) -> Result<T, AppError> {
        retry_with_backoff(|| self.get_once::<T>(url.clone()), self.retry.clone(), operation).await
    }
}

#[async_trait]
impl MetricsSource for DefiLlamaClient {
    async fn fetch_protocol_universe(&self) -> Result<Vec<ProtocolMetrics>, AppError> {
        let url = self.endpoint(&["protocols"])?;
        let raw: Vec<Value> = self.get_json(url, "fetch_protocol_universe").await?;
        let total = raw.len();

        let protocols: Vec<ProtocolMetrics> = raw
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<LlamaProtocol>(entry) {
                Ok(protocol) => protocol.into_metrics(),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed protocol entry");
                    None
                }
            })
            .collect();

        if protocols.len() < total {
            warn!(
                skipped = total - protocols.len(),
                total,
                "Metrics source returned unusable protocol entries"
            );
        }
        info!(count = protocols.len(), "Fetched protocol universe");
        Ok(protocols)
    }

    async fn fetch_tvl_history(&self, protocol_slug: &str) -> Result<Vec<TvlSample>, AppError> {
        let url = self.endpoint(&["protocol", protocol_slug])?;
        let detail: LlamaProtocolDetail = self.get_json(url, "fetch_tvl_history").await?;

        let mut samples: Vec<TvlSample> = detail
            .tvl
            .unwrap_or_default()
            .into_iter()
            .filter_map(LlamaTvlPoint::into_sample)
            .collect();
        samples.sort_by_key(|sample| sample.timestamp);

        debug!(protocol = %protocol_slug, samples = samples.len(), "Fetched TVL history");
        Ok(samples)
    }
}
