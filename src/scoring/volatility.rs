use chrono::{DateTime, Utc};

use crate::models::TvlSample;
use crate::utils::math::{fractional_returns, population_std_dev};
use crate::utils::time::window_start_unix;

pub const VOLATILITY_WINDOW_DAYS: i64 = 90;
pub const MAX_VOLATILITY: f64 = 100.0;
/// Used by the stability scorer when no history was supplied at all
pub const DEFAULT_VOLATILITY: f64 = 50.0;

/// Recent TVL volatility in `[0, 100]`.
///
/// Population standard deviation of period-over-period returns across the
/// samples inside the trailing 90-day window ending at `now`, expressed in
/// percent. Fewer than two samples in the window, or no usable returns,
/// yields 0.
pub fn calculate_tvl_volatility(history: &[TvlSample], now: DateTime<Utc>) -> f64 {
    let window_start = window_start_unix(now, VOLATILITY_WINDOW_DAYS);
    let window_end = now.timestamp();

    let values: Vec<f64> = history
        .iter()
        .filter(|sample| sample.timestamp >= window_start && sample.timestamp <= window_end)
        .filter(|sample| sample.tvl_usd.is_finite())
        .map(|sample| sample.tvl_usd)
        .collect();

    if values.len() < 2 {
        return 0.0;
    }

    let returns = fractional_returns(&values);
    let std_dev = match population_std_dev(&returns) {
        Some(std_dev) => std_dev,
        None => return 0.0,
    };

    let volatility = std_dev * 100.0;
    if volatility.is_nan() {
        // only reachable through overflowing returns
        return MAX_VOLATILITY;
    }
    volatility.clamp(0.0, MAX_VOLATILITY)
}
