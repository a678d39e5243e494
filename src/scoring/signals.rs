// Data-source seams for the scoring inputs that are not yet backed by real data.
// The defaults here are coarse heuristics; swap in a real provider through
// `ProtocolScorer::with_*` without touching the aggregator.
use std::collections::HashMap;

use crate::scoring::NormalizedMetrics;

/// Whether a protocol runs an active governance / DAO structure
pub trait GovernanceSignal: Send + Sync {
    fn has_active_governance(&self, protocol: &NormalizedMetrics) -> bool;

    fn name(&self) -> &'static str;
}

/// Number of known exploits against a protocol
pub trait ExploitHistory: Send + Sync {
    fn exploit_count(&self, protocol: &NormalizedMetrics) -> u32;

    fn name(&self) -> &'static str;
}

/// Whether a protocol is a centralized exchange rather than open-source DeFi
pub trait ExchangeSignal: Send + Sync {
    fn is_centralized_exchange(&self, protocol: &NormalizedMetrics) -> bool;

    fn name(&self) -> &'static str;
}

/// Governance inferred from the category or name mentioning governance / DAO.
#[derive(Debug, Clone, Default)]
pub struct KeywordGovernanceSignal;

impl GovernanceSignal for KeywordGovernanceSignal {
    fn has_active_governance(&self, protocol: &NormalizedMetrics) -> bool {
        let category_hit = protocol
            .category
            .as_deref()
            .map(|c| c.to_lowercase().contains("governance"))
            .unwrap_or(false);
        category_hit || protocol.name.to_lowercase().contains("dao")
    }

    fn name(&self) -> &'static str {
        "keyword_governance"
    }
}

/// No exploit database wired in: every protocol has a clean record.
#[derive(Debug, Clone, Default)]
pub struct NoKnownExploits;

impl ExploitHistory for NoKnownExploits {
    fn exploit_count(&self, _protocol: &NormalizedMetrics) -> u32 {
        0
    }

    fn name(&self) -> &'static str {
        "no_known_exploits"
    }
}

/// Exploit counts from a fixed table keyed by protocol slug.
#[derive(Debug, Clone, Default)]
pub struct KnownExploits {
    counts: HashMap<String, u32>,
}

impl KnownExploits {
    pub fn new(counts: HashMap<String, u32>) -> Self {
        Self { counts }
    }
}

impl ExploitHistory for KnownExploits {
    fn exploit_count(&self, protocol: &NormalizedMetrics) -> u32 {
        self.counts.get(&protocol.slug).copied().unwrap_or(0)
    }

    fn name(&self) -> &'static str {
        "known_exploits"
    }
}

/// CEX detection from the category tag and well-known exchange names.
#[derive(Debug, Clone, Default)]
pub struct CategoryExchangeSignal;

impl ExchangeSignal for CategoryExchangeSignal {
    fn is_centralized_exchange(&self, protocol: &NormalizedMetrics) -> bool {
        let is_cex_category = protocol
            .category
            .as_deref()
            .map(|c| c.trim().eq_ignore_ascii_case("cex"))
            .unwrap_or(false);
        is_cex_category || protocol.name.to_lowercase().contains("binance")
    }

    fn name(&self) -> &'static str {
        "category_exchange"
    }
}
