use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::AppError;
use crate::models::RefreshSummary;

/// Prometheus instruments for the refresh pipeline, registered on a private registry.
#[derive(Clone)]
pub struct RefreshMetrics {
    registry: Registry,
    passes_total: IntCounter,
    protocols_processed_total: IntCounter,
    protocols_updated_total: IntCounter,
    protocol_failures_total: IntCounterVec,
    alerts_emitted_total: IntCounter,
    persistence_failures_total: IntCounter,
    last_pass_timestamp: IntGauge,
    pass_duration_seconds: Histogram,
}

impl RefreshMetrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new_custom(Some("protocol_scores".to_string()), None)?;

        let passes_total = IntCounter::new("refresh_passes_total", "Completed refresh passes")?;
        let protocols_processed_total =
            IntCounter::new("protocols_processed_total", "Protocols attempted by refresh passes")?;
        let protocols_updated_total =
            IntCounter::new("protocols_updated_total", "Protocol score records written")?;
        let protocol_failures_total = IntCounterVec::new(
            Opts::new("protocol_failures_total", "Per-protocol failures by pipeline stage"),
            &["stage"],
        )?;
        let alerts_emitted_total = IntCounter::new("alerts_emitted_total", "Alert rows written")?;
        let persistence_failures_total =
            IntCounter::new("persistence_failures_total", "Failed bulk writes")?;
        let last_pass_timestamp =
            IntGauge::new("last_refresh_timestamp_seconds", "Unix time the last pass finished")?;
        let pass_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("refresh_pass_duration_seconds", "Wall time of a refresh pass")
                .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        )?;

        registry.register(Box::new(passes_total.clone()))?;
        registry.register(Box::new(protocols_processed_total.clone()))?;
        registry.register(Box::new(protocols_updated_total.clone()))?;
        registry.register(Box::new(protocol_failures_total.clone()))?;
        registry.register(Box::new(alerts_emitted_total.clone()))?;
        registry.register(Box::new(persistence_failures_total.clone()))?;
        registry.register(Box::new(last_pass_timestamp.clone()))?;
        registry.register(Box::new(pass_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            passes_total,
            protocols_processed_total,
            protocols_updated_total,
            protocol_failures_total,
            alerts_emitted_total,
            persistence_failures_total,
            last_pass_timestamp,
            pass_duration_seconds,
        })
    }

    pub fn record_pass(&self, summary: &RefreshSummary) {
        self.passes_total.inc();
        self.protocols_processed_total.inc_by(summary.processed as u64);
        self.protocols_updated_total.inc_by(summary.updated as u64);
        self.alerts_emitted_total.inc_by(summary.alerts_emitted as u64);
        self.persistence_failures_total
            .inc_by(summary.persistence_failures.len() as u64);
        for failure in &summary.failures {
            self.protocol_failures_total
                .with_label_values(&[failure.stage.as_str()])
                .inc();
        }
        self.last_pass_timestamp.set(summary.finished_at.timestamp());
        self.pass_duration_seconds
            .observe(summary.duration_ms as f64 / 1000.0);
    }

    pub fn export(&self) -> Result<String, AppError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| AppError::InternalError(format!("Metrics are not valid UTF-8: {}", e)))
    }
}
