/// Round to the nearest integer, with halves rounding towards positive infinity.
///
/// Stored scores were produced with this convention, so `2.5 -> 3` and
/// `-2.5 -> -2` (unlike `f64::round`, which rounds halves away from zero).
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Round and clamp a score component into `[0, max]`.
pub fn bounded_score(value: f64, max: u32) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    round_half_up(value).clamp(0.0, max as f64) as u32
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values
        .iter()
        .map(|x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}

/// Period-over-period fractional returns, skipping pairs whose base is not positive.
pub fn fractional_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|pair| pair[0] > 0.0)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect()
}
