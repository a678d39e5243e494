#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use defi_protocol_scores::error::AppError;
use defi_protocol_scores::models::{Alert, ProtocolMetrics, ProtocolScoreRecord, ScoreHistoryEntry, TvlSample};
use defi_protocol_scores::services::{
    AlertSink, DatabaseProbe, MetricsSource, ProtocolReader, RefreshConfig, RefreshOrchestrator, ScoreStore,
    SubscriberDirectory,
};
use defi_protocol_scores::utils::time::SECONDS_PER_DAY;

/// Scripted metrics source.
#[derive(Default)]
pub struct FakeMetricsSource {
    pub universe: Mutex<Option<Vec<ProtocolMetrics>>>,
    pub histories: Mutex<HashMap<String, Vec<TvlSample>>>,
    pub failing: Mutex<HashSet<String>>,
    pub hanging: Mutex<HashSet<String>>,
    pub universe_delay: Mutex<Option<Duration>>,
    pub universe_in_flight: AtomicUsize,
    pub max_universe_in_flight: AtomicUsize,
    pub history_calls: AtomicUsize,
}

impl FakeMetricsSource {
    pub fn with_universe(protocols: Vec<ProtocolMetrics>) -> Self {
        let source = Self::default();
        *source.universe.lock().unwrap() = Some(protocols);
        source
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set_history(&self, slug: &str, history: Vec<TvlSample>) {
        self.histories.lock().unwrap().insert(slug.to_string(), history);
    }

    pub fn fail_history(&self, slug: &str) {
        self.failing.lock().unwrap().insert(slug.to_string());
    }

    pub fn hang_history(&self, slug: &str) {
        self.hanging.lock().unwrap().insert(slug.to_string());
    }
}

#[async_trait]
impl MetricsSource for FakeMetricsSource {
    async fn fetch_protocol_universe(&self) -> Result<Vec<ProtocolMetrics>, AppError> {
        let in_flight = self.universe_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_universe_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.universe_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.universe_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.universe
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::ExternalApiError("/protocols returned HTTP 503".to_string()))
    }

    async fn fetch_tvl_history(&self, protocol_slug: &str) -> Result<Vec<TvlSample>, AppError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);

        let hangs = self.hanging.lock().unwrap().contains(protocol_slug);
        if hangs {
            futures::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(protocol_slug) {
            return Err(AppError::ExternalApiError(format!("history for {} unavailable", protocol_slug)));
        }
        Ok(self
            .histories
            .lock()
            .unwrap()
            .get(protocol_slug)
            .cloned()
            .unwrap_or_default())
    }
}

/// In-memory stand-in for every persistence collaborator.
#[derive(Default)]
pub struct InMemoryStore {
    pub records: Mutex<HashMap<String, ProtocolScoreRecord>>,
    pub history: Mutex<Vec<ScoreHistoryEntry>>,
    pub alerts: Mutex<Vec<Alert>>,
    pub watchers: Mutex<HashMap<String, Vec<String>>>,
    pub fail_upsert: AtomicBool,
    pub fail_alerts: AtomicBool,
    pub fail_watchers: AtomicBool,
    pub watcher_delay: Mutex<Option<Duration>>,
    pub fail_prior_for: Mutex<HashSet<String>>,
    pub database_down: AtomicBool,
    pub upsert_calls: AtomicUsize,
    pub alert_calls: AtomicUsize,
    pub reads: AtomicUsize,
}

impl InMemoryStore {
    pub fn seed_score(&self, slug: &str, name: &str, score: i32) {
        self.records
            .lock()
            .unwrap()
            .insert(slug.to_string(), score_record(slug, name, score));
    }

    pub fn watch(&self, slug: &str, users: &[&str]) {
        self.watchers
            .lock()
            .unwrap()
            .insert(slug.to_string(), users.iter().map(|u| u.to_string()).collect());
    }

    pub fn score_of(&self, slug: &str) -> Option<i32> {
        self.records.lock().unwrap().get(slug).map(|r| r.score_overall)
    }
}

#[async_trait]
impl ScoreStore for InMemoryStore {
    async fn get_prior_score(&self, protocol_slug: &str) -> Result<Option<u32>, AppError> {
        if self.fail_prior_for.lock().unwrap().contains(protocol_slug) {
            return Err(AppError::DatabaseError("prior score read failed".to_string()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(protocol_slug)
            .map(|r| r.score_overall.max(0) as u32))
    }

    async fn upsert_scores(&self, records: &[ProtocolScoreRecord]) -> Result<usize, AppError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("connection reset".to_string()));
        }
        let mut stored = self.records.lock().unwrap();
        for record in records {
            stored.insert(record.slug.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn append_score_history(&self, entries: &[ScoreHistoryEntry]) -> Result<usize, AppError> {
        self.history.lock().unwrap().extend_from_slice(entries);
        Ok(entries.len())
    }
}

#[async_trait]
impl SubscriberDirectory for InMemoryStore {
    async fn get_watchers(&self, protocol_slug: &str) -> Result<Vec<String>, AppError> {
        let delay = *self.watcher_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_watchers.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("watchlist unavailable".to_string()));
        }
        Ok(self
            .watchers
            .lock()
            .unwrap()
            .get(protocol_slug)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl AlertSink for InMemoryStore {
    async fn insert_alerts(&self, alerts: &[Alert]) -> Result<usize, AppError> {
        self.alert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_alerts.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("alerts table locked".to_string()));
        }
        self.alerts.lock().unwrap().extend_from_slice(alerts);
        Ok(alerts.len())
    }
}

#[async_trait]
impl ProtocolReader for InMemoryStore {
    async fn list_protocols(&self) -> Result<Vec<ProtocolScoreRecord>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut records: Vec<ProtocolScoreRecord> = self.records.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| b.score_overall.cmp(&a.score_overall).then_with(|| a.slug.cmp(&b.slug)));
        Ok(records)
    }

    async fn get_protocol(&self, slug: &str) -> Result<Option<ProtocolScoreRecord>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().get(slug).cloned())
    }
}

#[async_trait]
impl DatabaseProbe for InMemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        if self.database_down.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("connection refused".to_string()));
        }
        Ok(())
    }
}

pub fn score_record(slug: &str, name: &str, score: i32) -> ProtocolScoreRecord {
    ProtocolScoreRecord {
        slug: slug.to_string(),
        name: name.to_string(),
        logo_url: None,
        website: None,
        chain: "Ethereum".to_string(),
        category: None,
        tvl: 100_000_000,
        age_days: 400,
        score_overall: score,
        score_security: 0,
        score_tvl_stability: 0,
        score_decentralization: 0,
        score_financial: 0,
        score_community: 0,
        volatility: 0.0,
        grade: "C+".to_string(),
        risk_level: "Medium".to_string(),
        last_updated: Utc::now(),
    }
}

/// Audited, multi-chain protocol listed `age_days` before `now`.
pub fn mature_protocol(name: &str, tvl_usd: f64, change_7d: f64, now: DateTime<Utc>) -> ProtocolMetrics {
    let mut metrics = ProtocolMetrics::new(name, name, tvl_usd);
    metrics.listed_at = Some(now.timestamp() - 1533 * SECONDS_PER_DAY);
    metrics.audits = Some("2".to_string());
    metrics.audit_links = (0..5).map(|i| format!("https://audits.example/{}/{}", name, i)).collect();
    metrics.change_7d = Some(change_7d);
    metrics.chains = vec!["Ethereum".to_string(), "Arbitrum".to_string()];
    metrics.category = Some("Lending".to_string());
    metrics
}

/// Thirty daily samples of a constant TVL ending just before `now`.
pub fn flat_history(tvl_usd: f64, now: DateTime<Utc>) -> Vec<TvlSample> {
    (1..=30)
        .rev()
        .map(|day| TvlSample::new(now.timestamp() - day * SECONDS_PER_DAY, tvl_usd))
        .collect()
}

pub fn test_config() -> RefreshConfig {
    RefreshConfig {
        min_tvl_usd: 10_000_000.0,
        max_batch_size: 50,
        history_concurrency: 2,
        history_timeout: Duration::from_millis(200),
    }
}

pub fn orchestrator(source: Arc<FakeMetricsSource>, store: Arc<InMemoryStore>) -> RefreshOrchestrator {
    RefreshOrchestrator::new(source, store.clone(), store.clone(), store, test_config())
}
