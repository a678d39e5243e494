use serde::{Deserialize, Serialize};

use crate::scoring::volatility::MAX_VOLATILITY;
use crate::scoring::NormalizedMetrics;
use crate::utils::math::{bounded_score, round_half_up};

pub const SECURITY_MAX: u32 = 30;
pub const STABILITY_MAX: u32 = 20;
pub const DECENTRALIZATION_MAX: u32 = 20;
pub const FINANCIAL_HEALTH_MAX: u32 = 20;
pub const COMMUNITY_MAX: u32 = 10;

const SUB_SCORE_MAX: f64 = 10.0;
const DAYS_TO_FULL_AGE_CREDIT: f64 = 365.0;
const TOKEN_DISTRIBUTION_PLACEHOLDER: u32 = 5;

const BILLION: f64 = 1_000_000_000.0;
const MILLION: f64 = 1_000_000.0;

/// One factor's score together with the sub-components that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorScore<D> {
    pub score: u32,
    pub max: u32,
    pub details: D,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityDetails {
    pub audit: u32,
    pub age: u32,
    pub exploit_history: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityDetails {
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecentralizationDetails {
    pub token_distribution: u32,
    pub governance: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialHealthDetails {
    pub revenue_trend: u32,
    pub treasury: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityDetails {
    pub open_source: u32,
    pub social: u32,
}

/// Audits, time in production and exploit record.
pub fn score_security(metrics: &NormalizedMetrics, exploit_count: u32) -> FactorScore<SecurityDetails> {
    let audit = if metrics.has_audits {
        round_half_up((5.0 + metrics.audit_count as f64).min(SUB_SCORE_MAX)) as u32
    } else {
        0
    };
    let age = round_half_up(
        (metrics.age_days as f64 / DAYS_TO_FULL_AGE_CREDIT * SUB_SCORE_MAX).min(SUB_SCORE_MAX),
    ) as u32;
    let exploit_history = round_half_up((SUB_SCORE_MAX - 2.0 * exploit_count as f64).max(0.0)) as u32;

    FactorScore {
        score: bounded_score((audit + age + exploit_history) as f64, SECURITY_MAX),
        max: SECURITY_MAX,
        details: SecurityDetails {
            audit,
            age,
            exploit_history,
        },
    }
}

/// Inverse of recent TVL volatility; `volatility` is in `[0, 100]`.
pub fn score_stability(volatility: f64) -> FactorScore<StabilityDetails> {
    let volatility = if volatility.is_finite() {
        volatility.clamp(0.0, MAX_VOLATILITY)
    } else {
        MAX_VOLATILITY
    };
    let raw = (STABILITY_MAX as f64 * (1.0 - volatility / MAX_VOLATILITY)).max(0.0);

    FactorScore {
        score: bounded_score(raw, STABILITY_MAX),
        max: STABILITY_MAX,
        details: StabilityDetails { volatility },
    }
}

/// Token distribution is a fixed mid value until on-chain holder data is sourced.
pub fn score_decentralization(
    _metrics: &NormalizedMetrics,
    has_governance: bool,
) -> FactorScore<DecentralizationDetails> {
    let token_distribution = TOKEN_DISTRIBUTION_PLACEHOLDER;
    let governance = if has_governance { 7 } else { 3 };

    FactorScore {
        score: bounded_score((token_distribution + governance) as f64, DECENTRALIZATION_MAX),
        max: DECENTRALIZATION_MAX,
        details: DecentralizationDetails {
            token_distribution,
            governance,
        },
    }
}

/// 7-day TVL trend as a revenue proxy plus treasury size by TVL.
pub fn score_financial_health(metrics: &NormalizedMetrics) -> FactorScore<FinancialHealthDetails> {
    let change = metrics.change_7d;
    let trend = if change > 0.0 {
        (5.0 + change / 2.0).min(SUB_SCORE_MAX)
    } else {
        (5.0 + change / 4.0).max(0.0)
    };
    let revenue_trend = round_half_up(trend) as u32;
    let treasury = treasury_step(metrics.tvl_usd);

    FactorScore {
        score: bounded_score((revenue_trend + treasury) as f64, FINANCIAL_HEALTH_MAX),
        max: FINANCIAL_HEALTH_MAX,
        details: FinancialHealthDetails {
            revenue_trend,
            treasury,
        },
    }
}

pub fn score_community(metrics: &NormalizedMetrics, is_cex: bool) -> FactorScore<CommunityDetails> {
    let open_source = if is_cex { 1 } else { 3 };
    let social = social_step(metrics.tvl_usd);

    FactorScore {
        score: bounded_score((open_source + social) as f64, COMMUNITY_MAX),
        max: COMMUNITY_MAX,
        details: CommunityDetails { open_source, social },
    }
}

fn treasury_step(tvl_usd: f64) -> u32 {
    match tvl_usd {
        t if t >= BILLION => 10,
        t if t >= 500.0 * MILLION => 8,
        t if t >= 100.0 * MILLION => 6,
        t if t >= 50.0 * MILLION => 4,
        t if t >= 10.0 * MILLION => 2,
        _ => 0,
    }
}

fn social_step(tvl_usd: f64) -> u32 {
    match tvl_usd {
        t if t >= BILLION => 5,
        t if t >= 100.0 * MILLION => 4,
        t if t >= 10.0 * MILLION => 3,
        t if t >= MILLION => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(tvl_usd: f64, change_7d: f64) -> NormalizedMetrics {
        NormalizedMetrics {
            slug: "test".to_string(),
            name: "Test".to_string(),
            category: None,
            age_days: 0,
            has_audits: false,
            audit_count: 0,
            chain_count: 1,
            is_multi_chain: false,
            tvl_usd,
            change_7d,
        }
    }

    #[test]
    fn test_security_full_marks() {
        let mut m = metrics(8.2e9, 2.0);
        m.age_days = 1533;
        m.has_audits = true;
        m.audit_count = 5;

        let security = score_security(&m, 0);
        assert_eq!(security.details, SecurityDetails { audit: 10, age: 10, exploit_history: 10 });
        assert_eq!(security.score, 30);
        assert_eq!(security.max, 30);
    }

    #[test]
    fn test_security_unaudited_new_protocol() {
        let security = score_security(&metrics(5e6, 0.0), 0);
        assert_eq!(security.details, SecurityDetails { audit: 0, age: 0, exploit_history: 10 });
        assert_eq!(security.score, 10);
    }

    #[test]
    fn test_security_age_ramp_and_exploits() {
        let mut m = metrics(1.0, 0.0);
        m.age_days = 182; // 4.986 -> 5
        m.has_audits = true; // indicator without links -> 5
        let security = score_security(&m, 3);
        assert_eq!(security.details, SecurityDetails { audit: 5, age: 5, exploit_history: 4 });
        assert_eq!(security.score, 14);

        assert_eq!(score_security(&m, 9).details.exploit_history, 0);
    }

    #[test]
    fn test_stability() {
        assert_eq!(score_stability(0.0).score, 20);
        assert_eq!(score_stability(50.0).score, 10);
        assert_eq!(score_stability(100.0).score, 0);
        // 20 * (1 - 0.125) = 17.5 rounds up
        assert_eq!(score_stability(12.5).score, 18);
        assert_eq!(score_stability(f64::NAN).score, 0);
    }

    #[test]
    fn test_decentralization() {
        let m = metrics(1.0, 0.0);
        assert_eq!(score_decentralization(&m, true).score, 12);
        assert_eq!(score_decentralization(&m, false).score, 8);
    }

    #[test]
    fn test_financial_health_trend_is_asymmetric() {
        // +2% -> 6, -20% -> 0, -2% -> 4.5 -> 5, +30% -> capped at 10
        assert_eq!(score_financial_health(&metrics(0.0, 2.0)).details.revenue_trend, 6);
        assert_eq!(score_financial_health(&metrics(0.0, -20.0)).details.revenue_trend, 0);
        assert_eq!(score_financial_health(&metrics(0.0, -2.0)).details.revenue_trend, 5);
        assert_eq!(score_financial_health(&metrics(0.0, 30.0)).details.revenue_trend, 10);
        assert_eq!(score_financial_health(&metrics(0.0, 0.0)).details.revenue_trend, 5);
    }

    #[test]
    fn test_treasury_thresholds_are_inclusive() {
        let treasury = |tvl| score_financial_health(&metrics(tvl, 0.0)).details.treasury;
        assert_eq!(treasury(1e9), 10);
        assert_eq!(treasury(999_999_999.0), 8);
        assert_eq!(treasury(5e8), 8);
        assert_eq!(treasury(1e8), 6);
        assert_eq!(treasury(5e7), 4);
        assert_eq!(treasury(1e7), 2);
        assert_eq!(treasury(9_999_999.0), 0);
    }

    #[test]
    fn test_community() {
        let big = metrics(8.2e9, 0.0);
        assert_eq!(score_community(&big, false).score, 8);
        assert_eq!(score_community(&big, true).score, 6);

        let social = |tvl| score_community(&metrics(tvl, 0.0), false).details.social;
        assert_eq!(social(1e8), 4);
        assert_eq!(social(1e7), 3);
        assert_eq!(social(1e6), 2);
        assert_eq!(social(999_999.0), 1);
    }
}
