//! Numerically stable accumulation for long spend series.

/// Compensated (Neumaier) summation.
///
/// Keeps a running compensation term so that summing many small spend
/// deltas into a large total does not lose low-order bits. NaN inputs
/// return NaN; once the running sum saturates to infinity the
/// compensation term is dropped.
pub fn compensated_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for v in values {
        if v.is_nan() {
            return f64::NAN;
        }
        let t = sum + v;
        if t.is_infinite() {
            sum = t;
            compensation = 0.0;
            continue;
        }
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

/// Arithmetic mean using compensated summation.
///
/// Returns NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    compensated_sum(values.iter().copied()) / values.len() as f64
}
