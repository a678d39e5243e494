pub mod aggregator;
pub mod change_detector;
pub mod errors;
pub mod factors;
pub mod normalizer;
pub mod signals;
pub mod volatility;

pub use aggregator::{aggregate, Grade, ProtocolScorer, RiskLevel, ScoreBreakdown, ScoreResult};
pub use change_detector::{detect_score_change, ScoreChange};
pub use errors::RefreshError;
pub use factors::FactorScore;
pub use normalizer::{normalize, NormalizedMetrics};
pub use signals::{
    CategoryExchangeSignal, ExchangeSignal, ExploitHistory, GovernanceSignal, KeywordGovernanceSignal,
    KnownExploits, NoKnownExploits,
};
pub use volatility::calculate_tvl_volatility;
