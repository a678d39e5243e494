use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::slugify;

/// Raw protocol metrics as supplied by the metrics source for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMetrics {
    pub id: String,
    pub name: String,
    /// Upstream slug, when the source provides one
    pub slug: Option<String>,
    pub chain: Option<String>,
    pub chains: Vec<String>,
    pub tvl_usd: f64,
    pub change_7d: Option<f64>,
    /// Listing time, seconds since epoch
    pub listed_at: Option<i64>,
    /// Upstream audit indicator ("0", "1", "2", ...)
    pub audits: Option<String>,
    pub audit_links: Vec<String>,
    pub category: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
}

impl ProtocolMetrics {
    /// Minimal metrics for a named protocol; everything optional left empty.
    pub fn new(id: impl Into<String>, name: impl Into<String>, tvl_usd: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: None,
            chain: None,
            chains: Vec::new(),
            tvl_usd,
            change_7d: None,
            listed_at: None,
            audits: None,
            audit_links: Vec::new(),
            category: None,
            logo_url: None,
            website: None,
        }
    }

    /// Identity key used for upserts, watchers, history and alerts.
    pub fn protocol_slug(&self) -> String {
        match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => slugify(&self.name),
        }
    }

    /// Display form of the chain list.
    pub fn chain_label(&self) -> String {
        if !self.chains.is_empty() {
            self.chains.join(", ")
        } else {
            self.chain
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string())
        }
    }
}

/// One timestamped value-locked snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TvlSample {
    /// Seconds since epoch
    pub timestamp: i64,
    pub tvl_usd: f64,
}

impl TvlSample {
    pub fn new(timestamp: i64, tvl_usd: f64) -> Self {
        Self { timestamp, tvl_usd }
    }
}

/// Persisted score row, one per protocol slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProtocolScoreRecord {
    pub slug: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub chain: String,
    pub category: Option<String>,
    pub tvl: i64,
    pub age_days: i32,
    pub score_overall: i32,
    pub score_security: i32,
    pub score_tvl_stability: i32,
    pub score_decentralization: i32,
    pub score_financial: i32,
    pub score_community: i32,
    pub volatility: f64,
    pub grade: String,
    pub risk_level: String,
    pub last_updated: DateTime<Utc>,
}
