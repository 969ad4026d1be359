//! Percentage deviation between actual and forecast values.

/// Absolute percentage deviation of `actual` from `forecast`.
///
/// Defined as `|actual - forecast| / forecast * 100` when `forecast > 0`,
/// and 0 otherwise. The zero-forecast case is a deliberate suppression
/// rule: a nonzero actual against a zero forecast yields 0, never a
/// division error.
///
/// NaN inputs propagate to NaN.
pub fn percentage_difference(actual: f64, forecast: f64) -> f64 {
    if actual.is_nan() || forecast.is_nan() {
        return f64::NAN;
    }
    if forecast > 0.0 {
        ((actual - forecast).abs() / forecast) * 100.0
    } else {
        0.0
    }
}

/// Signed percentage change from `previous` to `current`.
///
/// Defined as `(current - previous) / previous * 100` when `previous != 0`,
/// and 0 otherwise. Unlike [`percentage_difference`] the sign is kept.
pub fn signed_percent_change(current: f64, previous: f64) -> f64 {
    if current.is_nan() || previous.is_nan() {
        return f64::NAN;
    }
    if previous == 0.0 {
        return 0.0;
    }
    ((current - previous) / previous) * 100.0
}
