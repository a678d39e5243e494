use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ProtocolMetrics;
use crate::utils::time::days_since_unix;

/// Bounded, unit-consistent inputs for the factor scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub slug: String,
    pub name: String,
    pub category: Option<String>,
    /// Whole days since listing; 0 when the listing time is unknown
    pub age_days: u32,
    pub has_audits: bool,
    pub audit_count: u32,
    pub chain_count: u32,
    pub is_multi_chain: bool,
    /// Non-negative, finite
    pub tvl_usd: f64,
    /// 7-day TVL change in percent; 0 when unknown
    pub change_7d: f64,
}

/// Normalize raw metrics against an explicit `now`.
///
/// Never fails: upstream gaps degrade to neutral values (age 0, unaudited,
/// single chain, zero TVL, flat trend).
pub fn normalize(metrics: &ProtocolMetrics, now: DateTime<Utc>) -> NormalizedMetrics {
    let age_days = metrics
        .listed_at
        .map(|listed_at| days_since_unix(listed_at, now).clamp(0, u32::MAX as i64) as u32)
        .unwrap_or(0);

    let audit_count = metrics
        .audit_links
        .iter()
        .filter(|link| !link.trim().is_empty())
        .count() as u32;
    let has_audits = audit_indicator(metrics.audits.as_deref()) || audit_count > 0;

    let chain_count = count_chains(metrics);

    NormalizedMetrics {
        slug: metrics.protocol_slug(),
        name: metrics.name.clone(),
        category: metrics.category.clone().filter(|c| !c.trim().is_empty()),
        age_days,
        has_audits,
        audit_count,
        chain_count,
        is_multi_chain: chain_count > 1,
        tvl_usd: finite_non_negative(metrics.tvl_usd),
        change_7d: metrics.change_7d.filter(|c| c.is_finite()).unwrap_or(0.0),
    }
}

/// Upstream marks audited protocols with a positive count string.
fn audit_indicator(raw: Option<&str>) -> bool {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .map(|count| count > 0)
        .unwrap_or(false)
}

fn count_chains(metrics: &ProtocolMetrics) -> u32 {
    let mut chains: Vec<String> = metrics
        .chains
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();
    chains.sort();
    chains.dedup();

    // a protocol with no chain information is treated as single-chain
    (chains.len() as u32).max(1)
}

fn finite_non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
