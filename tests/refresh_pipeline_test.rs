mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use common::{flat_history, mature_protocol, orchestrator, FakeMetricsSource, InMemoryStore};
use defi_protocol_scores::models::{AlertKind, AlertSeverity, FailureStage, ProtocolMetrics};
use defi_protocol_scores::scoring::{Grade, ProtocolScorer, RefreshError, RiskLevel};
use defi_protocol_scores::utils::{CacheConfig, ProtocolCache, RefreshMetrics};

fn three_protocol_universe() -> (Arc<FakeMetricsSource>, Vec<ProtocolMetrics>) {
    let now = Utc::now();
    let protocols = vec![
        mature_protocol("Aave", 9e9, 2.0, now),
        mature_protocol("Curve", 3e9, 2.0, now),
        mature_protocol("Uniswap", 5e9, 2.0, now),
    ];
    let source = Arc::new(FakeMetricsSource::with_universe(protocols.clone()));
    for protocol in &protocols {
        source.set_history(&protocol.protocol_slug(), flat_history(protocol.tvl_usd, now));
    }
    (source, protocols)
}

/// TVL $150M, 7-day change -16%, calm history: scores exactly 72.
fn seventy_two_pointer() -> (Arc<FakeMetricsSource>, String) {
    let now = Utc::now();
    let protocol = mature_protocol("Lend X", 150_000_000.0, -16.0, now);
    let slug = protocol.protocol_slug();
    let source = Arc::new(FakeMetricsSource::with_universe(vec![protocol]));
    source.set_history(&slug, flat_history(150_000_000.0, now));
    (source, slug)
}

#[test]
fn test_blue_chip_protocol_grades_in_a_range() {
    let now = Utc::now();
    let metrics = mature_protocol("Lido", 8.2e9, 2.0, now);
    let result = ProtocolScorer::default().score(&metrics, Some(&flat_history(8.2e9, now)), now);

    let security = &result.breakdown.security.details;
    assert_eq!((security.audit, security.age, security.exploit_history), (10, 10, 10));
    assert_eq!(result.breakdown.security.score, 30);
    assert!(matches!(result.grade, Grade::A | Grade::AMinus), "got {}", result.grade);
    assert_eq!(result.risk, RiskLevel::Low);
}

#[test]
fn test_young_unaudited_protocol_is_high_risk() {
    let now = Utc::now();
    let mut metrics = ProtocolMetrics::new("99", "Fresh Farm", 5_000_000.0);
    metrics.change_7d = Some(-20.0);

    let result = ProtocolScorer::default().score(&metrics, None, now);

    let security = &result.breakdown.security.details;
    assert_eq!((security.audit, security.age, security.exploit_history), (0, 0, 10));
    assert_eq!(result.breakdown.security.score, 10);
    assert_eq!(result.breakdown.financial_health.score, 0);
    assert!(result.grade <= Grade::CPlus, "got {}", result.grade);
    assert_eq!(result.risk, RiskLevel::High);
}

#[tokio::test]
async fn test_history_failure_is_isolated_to_one_protocol() {
    let (source, _) = three_protocol_universe();
    source.fail_history("uniswap");
    let store = Arc::new(InMemoryStore::default());

    let summary = orchestrator(source, store.clone()).run_pass().await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.failures[0].protocol, "uniswap");
    assert_eq!(summary.failures[0].stage, FailureStage::History);
    assert!(summary.persistence_failures.is_empty());

    assert!(store.score_of("aave").is_some());
    assert!(store.score_of("curve").is_some());
    assert!(store.score_of("uniswap").is_none());
    assert_eq!(store.history.lock().unwrap().len(), 2);
    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_score_rise_alerts_every_watcher() {
    let (source, slug) = seventy_two_pointer();
    let store = Arc::new(InMemoryStore::default());
    store.seed_score(&slug, "Lend X", 60);
    store.watch(&slug, &["alice", "bob"]);

    let summary = orchestrator(source, store.clone()).run_pass().await.unwrap();

    assert_eq!(store.score_of(&slug), Some(72));
    assert_eq!(summary.score_changes, 1);
    assert_eq!(summary.alerts_emitted, 2);

    let alerts = store.alerts.lock().unwrap();
    let recipients: Vec<&str> = alerts.iter().map(|a| a.recipient.as_str()).collect();
    assert_eq!(recipients, vec!["alice", "bob"]);
    for alert in alerts.iter() {
        assert_eq!(alert.kind, AlertKind::ScoreRise);
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(alert.title, "Lend X score changed");
        assert_eq!(alert.message, "Score changed from 60 to 72");
        assert_eq!(alert.protocol_slug, slug);
        assert!(!alert.is_read);
    }
}

#[tokio::test]
async fn test_new_protocol_raises_no_alert() {
    let (source, slug) = seventy_two_pointer();
    let store = Arc::new(InMemoryStore::default());
    store.watch(&slug, &["alice"]);

    let summary = orchestrator(source, store.clone()).run_pass().await.unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.score_changes, 0);
    assert_eq!(summary.alerts_emitted, 0);
    assert_eq!(store.alert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_small_move_raises_no_alert() {
    let (source, slug) = seventy_two_pointer();
    let store = Arc::new(InMemoryStore::default());
    store.seed_score(&slug, "Lend X", 68);
    store.watch(&slug, &["alice"]);

    let summary = orchestrator(source, store.clone()).run_pass().await.unwrap();

    assert_eq!(summary.score_changes, 0);
    assert!(store.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_universe_fails_the_pass() {
    let source = Arc::new(FakeMetricsSource::unavailable());
    let store = Arc::new(InMemoryStore::default());

    let result = orchestrator(source, store.clone()).run_pass().await;

    assert!(matches!(result, Err(RefreshError::UniverseUnavailable { .. })));
    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_selection_skips_small_protocols() {
    let now = Utc::now();
    let source = Arc::new(FakeMetricsSource::with_universe(vec![
        mature_protocol("Big", 2e9, 0.0, now),
        mature_protocol("Tiny", 5_000_000.0, 0.0, now),
        mature_protocol("Floor", 10_000_000.0, 0.0, now),
    ]));
    let store = Arc::new(InMemoryStore::default());

    let summary = orchestrator(source.clone(), store.clone()).run_pass().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(source.history_calls.load(Ordering::SeqCst), 1);
    assert!(store.score_of("tiny").is_none());
    assert!(store.score_of("floor").is_none());
}

#[tokio::test]
async fn test_stuck_history_fetch_times_out() {
    let (source, _) = three_protocol_universe();
    source.hang_history("curve");
    let store = Arc::new(InMemoryStore::default());

    let summary = orchestrator(source, store.clone()).run_pass().await.unwrap();

    assert_eq!(summary.updated, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.failures[0].protocol, "curve");
    assert!(summary.failures[0].message.contains("timed out"));
}

#[tokio::test]
async fn test_prior_score_failure_skips_protocol() {
    let (source, _) = three_protocol_universe();
    let store = Arc::new(InMemoryStore::default());
    store.fail_prior_for.lock().unwrap().insert("aave".to_string());

    let summary = orchestrator(source, store.clone()).run_pass().await.unwrap();

    assert_eq!(summary.updated, 2);
    assert_eq!(summary.failures[0].stage, FailureStage::PriorScore);
    assert!(store.score_of("aave").is_none());
}

#[tokio::test]
async fn test_upsert_failure_is_reported_and_alerts_held_back() {
    let (source, slug) = seventy_two_pointer();
    let store = Arc::new(InMemoryStore::default());
    store.seed_score(&slug, "Lend X", 60);
    store.watch(&slug, &["alice"]);
    store.fail_upsert.store(true, Ordering::SeqCst);

    let summary = orchestrator(source, store.clone()).run_pass().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.score_changes, 1);
    assert_eq!(summary.alerts_emitted, 0);
    assert_eq!(summary.persistence_failures.len(), 1);
    assert!(summary.persistence_failures[0].contains("upsert_scores"));
    assert_eq!(store.alert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.score_of(&slug), Some(60));
}

#[tokio::test]
async fn test_alert_insert_failure_is_reported() {
    let (source, slug) = seventy_two_pointer();
    let store = Arc::new(InMemoryStore::default());
    store.seed_score(&slug, "Lend X", 60);
    store.watch(&slug, &["alice"]);
    store.fail_alerts.store(true, Ordering::SeqCst);

    let summary = orchestrator(source, store.clone()).run_pass().await.unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.alerts_emitted, 0);
    assert!(summary.persistence_failures[0].contains("insert_alerts"));
}

#[tokio::test]
async fn test_watcher_lookup_failure_keeps_the_score() {
    let (source, slug) = seventy_two_pointer();
    let store = Arc::new(InMemoryStore::default());
    store.seed_score(&slug, "Lend X", 60);
    store.fail_watchers.store(true, Ordering::SeqCst);

    let summary = orchestrator(source, store.clone()).run_pass().await.unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(store.score_of(&slug), Some(72));
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.failures[0].stage, FailureStage::Watchers);
    assert_eq!(summary.alerts_emitted, 0);
}

#[tokio::test]
async fn test_rerunning_a_pass_is_idempotent() {
    let (source, _) = three_protocol_universe();
    let store = Arc::new(InMemoryStore::default());
    let orchestrator = orchestrator(source, store.clone());

    orchestrator.run_pass().await.unwrap();
    let first: Vec<Option<i32>> = ["aave", "curve", "uniswap"].iter().map(|s| store.score_of(s)).collect();

    let summary = orchestrator.run_pass().await.unwrap();
    let second: Vec<Option<i32>> = ["aave", "curve", "uniswap"].iter().map(|s| store.score_of(s)).collect();

    assert_eq!(first, second);
    assert_eq!(summary.score_changes, 0);
    assert_eq!(store.records.lock().unwrap().len(), 3);
    assert_eq!(store.history.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn test_passes_never_overlap() {
    let (source, _) = three_protocol_universe();
    *source.universe_delay.lock().unwrap() = Some(Duration::from_millis(50));
    let store = Arc::new(InMemoryStore::default());
    let orchestrator = orchestrator(source.clone(), store);

    let (first, second) = tokio::join!(orchestrator.run_pass(), orchestrator.run_pass());

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(source.max_universe_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_successful_upsert_invalidates_cache_and_records_metrics() {
    let (source, _) = three_protocol_universe();
    let store = Arc::new(InMemoryStore::default());
    let cache = ProtocolCache::new(CacheConfig::default());
    cache.insert(common::score_record("aave", "Aave", 10)).await;
    let metrics = Arc::new(RefreshMetrics::new().unwrap());

    let orchestrator = orchestrator(source, store)
        .with_cache(cache.clone())
        .with_metrics(metrics.clone());
    orchestrator.run_pass().await.unwrap();

    assert!(cache.get("aave").await.is_none());
    let exported = metrics.export().unwrap();
    assert!(exported.contains("protocol_scores_protocols_processed_total 3"));
    assert!(exported.contains("protocol_scores_protocols_updated_total 3"));
}
