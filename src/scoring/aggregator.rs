use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ProtocolMetrics, TvlSample};
use crate::scoring::factors::{
    score_community, score_decentralization, score_financial_health, score_security, score_stability,
    CommunityDetails, DecentralizationDetails, FactorScore, FinancialHealthDetails, SecurityDetails,
    StabilityDetails,
};
use crate::scoring::normalizer::{normalize, NormalizedMetrics};
use crate::scoring::signals::{
    CategoryExchangeSignal, ExchangeSignal, ExploitHistory, GovernanceSignal, KeywordGovernanceSignal,
    NoKnownExploits,
};
use crate::scoring::volatility::{calculate_tvl_volatility, DEFAULT_VOLATILITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "F")]
    F,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "A")]
    A,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 85 => Grade::A,
            s if s >= 80 => Grade::AMinus,
            s if s >= 75 => Grade::BPlus,
            s if s >= 70 => Grade::B,
            s if s >= 65 => Grade::BMinus,
            s if s >= 60 => Grade::CPlus,
            s if s >= 55 => Grade::C,
            s if s >= 50 => Grade::CMinus,
            s if s >= 45 => Grade::DPlus,
            s if s >= 40 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk tier. Ordered from least to most risky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 70 {
            RiskLevel::Low
        } else if score >= 50 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub security: FactorScore<SecurityDetails>,
    pub tvl_stability: FactorScore<StabilityDetails>,
    pub decentralization: FactorScore<DecentralizationDetails>,
    pub financial_health: FactorScore<FinancialHealthDetails>,
    pub community: FactorScore<CommunityDetails>,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.security.score
            + self.tvl_stability.score
            + self.decentralization.score
            + self.financial_health.score
            + self.community.score
    }
}

/// Overall score, grade and risk tier with the per-factor breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u32,
    pub grade: Grade,
    pub risk: RiskLevel,
    /// Volatility fed to the stability factor
    pub volatility: f64,
    pub breakdown: ScoreBreakdown,
}

/// Runs the five factor scorers and aggregates them.
///
/// Inputs that are not backed by real data (governance, exploit history,
/// exchange classification) come from the injected signal providers.
#[derive(Clone)]
pub struct ProtocolScorer {
    governance: Arc<dyn GovernanceSignal>,
    exploits: Arc<dyn ExploitHistory>,
    exchanges: Arc<dyn ExchangeSignal>,
}

impl Default for ProtocolScorer {
    fn default() -> Self {
        Self {
            governance: Arc::new(KeywordGovernanceSignal),
            exploits: Arc::new(NoKnownExploits),
            exchanges: Arc::new(CategoryExchangeSignal),
        }
    }
}

impl ProtocolScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_governance(mut self, governance: Arc<dyn GovernanceSignal>) -> Self {
        self.governance = governance;
        self
    }

    pub fn with_exploit_history(mut self, exploits: Arc<dyn ExploitHistory>) -> Self {
        self.exploits = exploits;
        self
    }

    pub fn with_exchange_signal(mut self, exchanges: Arc<dyn ExchangeSignal>) -> Self {
        self.exchanges = exchanges;
        self
    }

    /// Score raw metrics. `history: None` means no history was supplied and
    /// stability falls back to a middling volatility of 50.
    pub fn score(
        &self,
        metrics: &ProtocolMetrics,
        history: Option<&[TvlSample]>,
        now: DateTime<Utc>,
    ) -> ScoreResult {
        let normalized = normalize(metrics, now);
        let volatility = match history {
            Some(samples) => calculate_tvl_volatility(samples, now),
            None => DEFAULT_VOLATILITY,
        };
        self.score_normalized(&normalized, volatility)
    }

    pub fn score_normalized(&self, metrics: &NormalizedMetrics, volatility: f64) -> ScoreResult {
        let breakdown = ScoreBreakdown {
            security: score_security(metrics, self.exploits.exploit_count(metrics)),
            tvl_stability: score_stability(volatility),
            decentralization: score_decentralization(
                metrics,
                self.governance.has_active_governance(metrics),
            ),
            financial_health: score_financial_health(metrics),
            community: score_community(metrics, self.exchanges.is_centralized_exchange(metrics)),
        };
        aggregate(breakdown)
    }
}

/// Sum the clamped factor scores and derive grade and risk tier.
pub fn aggregate(breakdown: ScoreBreakdown) -> ScoreResult {
    // factor maxima sum to 100
    let score = breakdown.total().min(100);
    ScoreResult {
        score,
        grade: Grade::from_score(score),
        risk: RiskLevel::from_score(score),
        volatility: breakdown.tvl_stability.details.volatility,
        breakdown,
    }
}
