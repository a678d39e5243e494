use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::CronSecret;
use crate::config::Settings;
use crate::database::{establish_connection, run_migrations, PostgresStore};
use crate::error::AppError;
use crate::services::{DefiLlamaClient, ProtocolService, RefreshConfig, RefreshOrchestrator};
use crate::utils::{CacheConfig, MinIntervalRateLimiter, ProtocolCache, RefreshMetrics};
use crate::AppState;

/// Everything the binaries need, wired from settings.
pub struct Components {
    pub pool: PgPool,
    pub store: Arc<PostgresStore>,
    pub cache: ProtocolCache,
    pub metrics: Arc<RefreshMetrics>,
    pub orchestrator: Arc<RefreshOrchestrator>,
}

/// Connect, migrate and build the refresh pipeline.
pub async fn build_components(settings: &Settings) -> Result<Components, AppError> {
    let pool = establish_connection(&settings.database).await?;
    run_migrations(&pool).await?;

    let store = Arc::new(PostgresStore::new(pool.clone()));
    let rate_limiter = Arc::new(MinIntervalRateLimiter::new(settings.metrics_source.min_call_interval()));
    let source = Arc::new(DefiLlamaClient::new(&settings.metrics_source, rate_limiter)?);
    let cache = ProtocolCache::new(CacheConfig::from(&settings.cache));
    let metrics = Arc::new(RefreshMetrics::new()?);

    let orchestrator = Arc::new(
        RefreshOrchestrator::new(
            source,
            store.clone(),
            store.clone(),
            store.clone(),
            RefreshConfig::from(settings),
        )
        .with_metrics(metrics.clone())
        .with_cache(cache.clone()),
    );

    info!(
        base_url = %settings.metrics_source.base_url,
        min_tvl_usd = settings.refresh.min_tvl_usd,
        max_batch_size = settings.refresh.max_batch_size,
        "Refresh pipeline ready"
    );

    Ok(Components {
        pool,
        store,
        cache,
        metrics,
        orchestrator,
    })
}

impl Components {
    pub fn app_state(&self, settings: &Settings) -> AppState {
        let cron_secret = settings.auth.cron_secret.as_deref().map(|s| Arc::new(CronSecret::new(s)));
        if cron_secret.is_none() {
            warn!("CRON_SECRET is not set; the refresh trigger will reject every request");
        }

        AppState {
            orchestrator: self.orchestrator.clone(),
            protocols: Arc::new(ProtocolService::new(self.store.clone(), self.cache.clone())),
            database: self.store.clone(),
            metrics: self.metrics.clone(),
            cron_secret,
        }
    }
}
