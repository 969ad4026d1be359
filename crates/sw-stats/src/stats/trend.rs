//! Period-over-period trend computation for dashboard metric cards.
//!
//! A trend compares the current period's value against the previous
//! period's and reports the magnitude of the change (one decimal place)
//! plus its direction. A zero previous period yields a flat trend rather
//! than an infinite one.

use serde::{Deserialize, Serialize};

use super::percent::signed_percent_change;

/// Magnitude and direction of a period-over-period change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Absolute percentage change, rounded to one decimal place.
    pub value: f64,
    /// True when the raw change is strictly positive.
    pub is_positive: bool,
}

impl Trend {
    /// A flat trend (no change, not positive).
    pub fn flat() -> Self {
        Trend {
            value: 0.0,
            is_positive: false,
        }
    }
}

/// Compute the trend from `previous` to `current`.
///
/// Rules:
/// - `previous == 0` yields [`Trend::flat`] regardless of `current`.
/// - Otherwise `value = |(current - previous) / previous * 100|` rounded
///   to one decimal, `is_positive = change > 0` (a zero change is not
///   positive).
pub fn percent_change(current: f64, previous: f64) -> Trend {
    if previous == 0.0 {
        return Trend::flat();
    }
    let change = signed_percent_change(current, previous);
    Trend {
        value: round1(change.abs()),
        is_positive: change > 0.0,
    }
}

/// Round to one decimal place, half away from zero.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
