use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::models::{
    Alert, FailureStage, ProtocolFailure, ProtocolMetrics, ProtocolScoreRecord, RefreshSummary,
    ScoreHistoryEntry,
};
use crate::scoring::{
    calculate_tvl_volatility, detect_score_change, normalize, NormalizedMetrics, ProtocolScorer, RefreshError,
    ScoreChange, ScoreResult,
};
use crate::services::{AlertSink, MetricsSource, ScoreStore, SubscriberDirectory};
use crate::utils::{ProtocolCache, RefreshMetrics};

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Protocols at or below this TVL are not scored
    pub min_tvl_usd: f64,
    pub max_batch_size: usize,
    /// Concurrent history fetches; the metrics source throttles underneath
    pub history_concurrency: usize,
    /// Hard deadline on one protocol's history fetch
    pub history_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            min_tvl_usd: 10_000_000.0,
            max_batch_size: 50,
            history_concurrency: 4,
            history_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&Settings> for RefreshConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            min_tvl_usd: settings.refresh.min_tvl_usd,
            max_batch_size: settings.refresh.max_batch_size,
            history_concurrency: settings.metrics_source.history_concurrency.max(1),
            history_timeout: settings.metrics_source.history_deadline(),
        }
    }
}

/// Choose the protocols for one pass: strictly above the TVL floor, largest
/// first, one entry per slug, capped at the batch size.
pub fn select_batch(universe: Vec<ProtocolMetrics>, min_tvl_usd: f64, max_batch_size: usize) -> Vec<ProtocolMetrics> {
    let mut eligible: Vec<ProtocolMetrics> = universe
        .into_iter()
        .filter(|p| p.tvl_usd.is_finite() && p.tvl_usd > min_tvl_usd)
        .collect();
    eligible.sort_by(|a, b| b.tvl_usd.total_cmp(&a.tvl_usd));

    // one upsert statement cannot touch the same slug twice
    let mut seen = HashSet::new();
    eligible.retain(|p| seen.insert(p.protocol_slug()));
    eligible.truncate(max_batch_size);
    eligible
}

/// A protocol that made it through scoring.
struct ScoredProtocol {
    metrics: ProtocolMetrics,
    normalized: NormalizedMetrics,
    result: ScoreResult,
    change: Option<ScoreChange>,
}

impl ScoredProtocol {
    fn to_record(&self, now: DateTime<Utc>) -> ProtocolScoreRecord {
        let breakdown = &self.result.breakdown;
        ProtocolScoreRecord {
            slug: self.normalized.slug.clone(),
            name: self.metrics.name.clone(),
            logo_url: self.metrics.logo_url.clone(),
            website: self.metrics.website.clone(),
            chain: self.metrics.chain_label(),
            category: self.normalized.category.clone(),
            tvl: self.normalized.tvl_usd.floor().min(i64::MAX as f64) as i64,
            age_days: self.normalized.age_days.min(i32::MAX as u32) as i32,
            score_overall: self.result.score as i32,
            score_security: breakdown.security.score as i32,
            score_tvl_stability: breakdown.tvl_stability.score as i32,
            score_decentralization: breakdown.decentralization.score as i32,
            score_financial: breakdown.financial_health.score as i32,
            score_community: breakdown.community.score as i32,
            volatility: self.result.volatility,
            grade: self.result.grade.to_string(),
            risk_level: self.result.risk.to_string(),
            last_updated: now,
        }
    }

    fn to_history_entry(&self, now: DateTime<Utc>) -> ScoreHistoryEntry {
        ScoreHistoryEntry {
            protocol_slug: self.normalized.slug.clone(),
            score_overall: self.result.score,
            grade: self.result.grade,
            recorded_at: now,
        }
    }
}

/// Drives refresh passes over the protocol universe.
///
/// Per-protocol failures are recorded and skipped; bulk write failures are
/// reported in the summary. Only an unavailable universe fails a pass.
pub struct RefreshOrchestrator {
    source: Arc<dyn MetricsSource>,
    scores: Arc<dyn ScoreStore>,
    subscribers: Arc<dyn SubscriberDirectory>,
    alerts: Arc<dyn AlertSink>,
    scorer: ProtocolScorer,
    config: RefreshConfig,
    metrics: Option<Arc<RefreshMetrics>>,
    cache: Option<ProtocolCache>,
    pass_lock: Mutex<()>,
}

impl RefreshOrchestrator {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        scores: Arc<dyn ScoreStore>,
        subscribers: Arc<dyn SubscriberDirectory>,
        alerts: Arc<dyn AlertSink>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            source,
            scores,
            subscribers,
            alerts,
            scorer: ProtocolScorer::default(),
            config,
            metrics: None,
            cache: None,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn with_scorer(mut self, scorer: ProtocolScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<RefreshMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Cache to invalidate once new scores are written.
    pub fn with_cache(mut self, cache: ProtocolCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Run one full pass. A pass already in progress is waited for, never overlapped.
    pub async fn run_pass(&self) -> Result<RefreshSummary, RefreshError> {
        let _guard = self.pass_lock.lock().await;
        let started = Instant::now();
        let now = Utc::now();

        info!("Starting protocol score refresh");

        let universe = self
            .source
            .fetch_protocol_universe()
            .await
            .map_err(|e| RefreshError::UniverseUnavailable { message: e.to_string() })?;
        let universe_size = universe.len();
        let batch = select_batch(universe, self.config.min_tvl_usd, self.config.max_batch_size);
        let processed = batch.len();

        info!(universe = universe_size, batch = processed, "Selected protocols for refresh");

        let outcomes: Vec<Result<ScoredProtocol, ProtocolFailure>> = stream::iter(batch)
            .map(|protocol| self.score_protocol(protocol, now))
            .buffered(self.config.history_concurrency.max(1))
            .collect()
            .await;

        let mut scored = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(protocol) => scored.push(protocol),
                Err(failure) => failures.push(failure),
            }
        }

        let mut persistence_failures = Vec::new();

        let records: Vec<ProtocolScoreRecord> = scored.iter().map(|p| p.to_record(now)).collect();
        let mut updated = 0;
        let mut scores_persisted = records.is_empty();
        if !records.is_empty() {
            match self.scores.upsert_scores(&records).await {
                Ok(rows) => {
                    updated = rows;
                    scores_persisted = true;
                    if let Some(cache) = &self.cache {
                        cache.invalidate_all();
                    }
                }
                Err(e) => {
                    let failure = RefreshError::PersistenceFailure {
                        operation: "upsert_scores".to_string(),
                        batch_size: records.len(),
                        message: e.to_string(),
                    };
                    error!(batch_size = records.len(), error = %e, "Bulk score upsert failed");
                    persistence_failures.push(failure.to_string());
                }
            }
        }

        let history: Vec<ScoreHistoryEntry> = scored.iter().map(|p| p.to_history_entry(now)).collect();
        if !history.is_empty() {
            if let Err(e) = self.scores.append_score_history(&history).await {
                let failure = RefreshError::PersistenceFailure {
                    operation: "append_score_history".to_string(),
                    batch_size: history.len(),
                    message: e.to_string(),
                };
                error!(batch_size = history.len(), error = %e, "Score history append failed");
                persistence_failures.push(failure.to_string());
            }
        }

        let changes: Vec<&ScoreChange> = scored.iter().filter_map(|p| p.change.as_ref()).collect();
        let score_changes = changes.len();

        let mut alerts_emitted = 0;
        if scores_persisted {
            let alerts = self.materialize_alerts(&changes, now, &mut failures).await;
            if !alerts.is_empty() {
                match self.alerts.insert_alerts(&alerts).await {
                    Ok(rows) => alerts_emitted = rows,
                    Err(e) => {
                        let failure = RefreshError::PersistenceFailure {
                            operation: "insert_alerts".to_string(),
                            batch_size: alerts.len(),
                            message: e.to_string(),
                        };
                        error!(batch_size = alerts.len(), error = %e, "Alert insert failed");
                        persistence_failures.push(failure.to_string());
                    }
                }
            }
        } else if score_changes > 0 {
            // the next pass compares against the old stored score and raises these again
            warn!(score_changes, "Skipping alerts because scores were not persisted");
        }

        let finished_at = Utc::now();
        let summary = RefreshSummary {
            processed,
            updated,
            score_changes,
            alerts_emitted,
            errors: failures.len(),
            failures,
            persistence_failures,
            started_at: now,
            finished_at,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_pass(&summary);
        }

        info!(
            processed = summary.processed,
            updated = summary.updated,
            score_changes = summary.score_changes,
            alerts_emitted = summary.alerts_emitted,
            errors = summary.errors,
            persistence_failures = summary.persistence_failures.len(),
            duration_ms = summary.duration_ms,
            "Protocol score refresh finished"
        );

        Ok(summary)
    }

    async fn score_protocol(
        &self,
        protocol: ProtocolMetrics,
        now: DateTime<Utc>,
    ) -> Result<ScoredProtocol, ProtocolFailure> {
        let slug = protocol.protocol_slug();

        let history = match tokio::time::timeout(
            self.config.history_timeout,
            self.source.fetch_tvl_history(&slug),
        )
        .await
        {
            Ok(Ok(history)) => history,
            Ok(Err(e)) => {
                let err = RefreshError::FetchFailure { protocol: slug.clone(), message: e.to_string() };
                return Err(self.skip(&slug, FailureStage::History, err));
            }
            Err(_) => {
                let err = RefreshError::Timeout {
                    protocol: slug.clone(),
                    seconds: self.config.history_timeout.as_secs(),
                };
                return Err(self.skip(&slug, FailureStage::History, err));
            }
        };

        let previous = match self.scores.get_prior_score(&slug).await {
            Ok(previous) => previous,
            Err(e) => {
                let err = RefreshError::FetchFailure { protocol: slug.clone(), message: e.to_string() };
                return Err(self.skip(&slug, FailureStage::PriorScore, err));
            }
        };

        let normalized = normalize(&protocol, now);
        let volatility = calculate_tvl_volatility(&history, now);
        let result = self.scorer.score_normalized(&normalized, volatility);
        let change = detect_score_change(&slug, &protocol.name, previous, result.score);

        debug!(
            protocol = %slug,
            score = result.score,
            grade = %result.grade,
            previous = ?previous,
            samples = history.len(),
            "Scored protocol"
        );

        Ok(ScoredProtocol {
            metrics: protocol,
            normalized,
            result,
            change,
        })
    }

    fn skip(&self, slug: &str, stage: FailureStage, err: RefreshError) -> ProtocolFailure {
        warn!(protocol = %slug, stage = stage.as_str(), error = %err, "Skipping protocol");
        ProtocolFailure {
            protocol: slug.to_string(),
            stage,
            message: err.to_string(),
        }
    }

    /// One alert per (change, watcher). A failed watcher lookup drops only that
    /// protocol's alerts.
    async fn materialize_alerts(
        &self,
        changes: &[&ScoreChange],
        now: DateTime<Utc>,
        failures: &mut Vec<ProtocolFailure>,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for change in changes {
            match self.subscribers.get_watchers(&change.protocol_slug).await {
                Ok(watchers) => {
                    debug!(
                        protocol = %change.protocol_slug,
                        watchers = watchers.len(),
                        kind = change.kind.as_str(),
                        "Materializing score change alerts"
                    );
                    alerts.extend(watchers.iter().map(|watcher| change.alert_for(watcher, now)));
                }
                Err(e) => {
                    let err = RefreshError::FetchFailure {
                        protocol: change.protocol_slug.clone(),
                        message: e.to_string(),
                    };
                    failures.push(self.skip(&change.protocol_slug, FailureStage::Watchers, err));
                }
            }
        }
        alerts
    }

    /// Run a pass every `period`, starting one period from now.
    pub fn spawn_schedule(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_seconds = period.as_secs(), "Scheduled protocol score refresh enabled");

            loop {
                ticker.tick().await;
                if let Err(e) = self.run_pass().await {
                    error!(error = %e, "Scheduled refresh pass failed");
                }
            }
        })
    }
}
