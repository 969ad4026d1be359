//! Window aggregation over classified deviations.
//!
//! [`DeviationSummary`] is a pure reduction: counts per severity, an
//! anomaly total, and the summed magnitude of anomalous deviations.
//! `merge` combines two summaries and `Default` is the identity, so
//! partial summaries can be folded in any order (per campaign, per
//! shard) and the counts come out the same.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use sw_stats::compensated_sum;

use crate::model::{ClassifiedDeviation, Severity};

/// Aggregate statistics for a window of classified deviations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DeviationSummary {
    /// Rows classified in the window, anomalous or not.
    pub total_rows: usize,

    /// Rows with tier above `none`.
    pub total_anomalies: usize,

    /// Anomalies at severity low (tier L1).
    pub low: usize,

    /// Anomalies at severity medium (tier L2).
    pub medium: usize,

    /// Anomalies at severity high (tier L3).
    pub high: usize,

    /// Sum of |actual - forecast| over anomalous rows only.
    pub total_magnitude: f64,
}

impl DeviationSummary {
    /// Summarize a window in one pass.
    ///
    /// Magnitude uses compensated accumulation, so long windows of
    /// small deltas do not lose low-order bits. The streaming
    /// [`observe`](Self::observe) path adds plainly instead.
    pub fn from_deviations<'a, I>(deviations: I) -> DeviationSummary
    where
        I: IntoIterator<Item = &'a ClassifiedDeviation>,
    {
        let mut summary = DeviationSummary::default();
        let mut magnitudes = Vec::new();
        for d in deviations {
            summary.count(d);
            if d.is_anomaly {
                magnitudes.push(d.difference.abs());
            }
        }
        summary.total_magnitude = compensated_sum(magnitudes);
        summary
    }

    /// Fold one deviation into the summary.
    pub fn observe(&mut self, deviation: &ClassifiedDeviation) {
        self.count(deviation);
        if deviation.is_anomaly {
            self.total_magnitude += deviation.difference.abs();
        }
    }

    fn count(&mut self, deviation: &ClassifiedDeviation) {
        self.total_rows += 1;
        if !deviation.is_anomaly {
            return;
        }
        self.total_anomalies += 1;
        match deviation.severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
        }
    }

    /// Combine two partial summaries. Counts are exact; magnitude is
    /// accurate to f64 addition.
    pub fn merge(&mut self, other: &DeviationSummary) {
        self.total_rows += other.total_rows;
        self.total_anomalies += other.total_anomalies;
        self.low += other.low;
        self.medium += other.medium;
        self.high += other.high;
        self.total_magnitude += other.total_magnitude;
    }

    /// Anomaly count at one severity.
    pub fn severity_count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
        }
    }

    /// Highest severity present in the window, if any row was anomalous.
    pub fn max_severity(&self) -> Option<Severity> {
        if self.high > 0 {
            Some(Severity::High)
        } else if self.medium > 0 {
            Some(Severity::Medium)
        } else if self.low > 0 {
            Some(Severity::Low)
        } else {
            None
        }
    }

    /// Anomalous fraction of classified rows, 0-100. Zero for an empty
    /// window.
    pub fn anomaly_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        self.total_anomalies as f64 / self.total_rows as f64 * 100.0
    }

    /// Whether any row was folded in.
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use chrono::{DateTime, TimeZone, Utc};
    use sw_config::ThresholdSet;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap()
    }

    fn dev(actual: f64, forecast: f64) -> ClassifiedDeviation {
        classify("camp-001", ts(), actual, forecast, &ThresholdSet::default())
    }

    #[test]
    fn test_empty_summary_is_identity() {
        let summary = DeviationSummary::default();
        assert!(summary.is_empty());
        assert_eq!(summary.total_anomalies, 0);
        assert_eq!(summary.total_magnitude, 0.0);
        assert_eq!(summary.max_severity(), None);
        assert_eq!(summary.anomaly_rate(), 0.0);
    }

    #[test]
    fn test_window_aggregation_scenario() {
        // Tiers: L1, L2, L3, none, L3.
        let deviations = vec![
            dev(115.0, 100.0),
            dev(145.0, 100.0),
            dev(200.0, 100.0),
            dev(105.0, 100.0),
            dev(250.0, 100.0),
        ];
        let summary = DeviationSummary::from_deviations(&deviations);

        assert_eq!(summary.total_rows, 5);
        assert_eq!(summary.total_anomalies, 4);
        assert_eq!(summary.high, 2);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.max_severity(), Some(Severity::High));
        // |15| + |45| + |100| + |150|, the none row contributes nothing.
        assert_eq!(summary.total_magnitude, 310.0);
    }

    #[test]
    fn test_magnitude_uses_absolute_difference() {
        // Underspend at L2: difference is -45 but magnitude is 45.
        let deviations = vec![dev(55.0, 100.0)];
        let summary = DeviationSummary::from_deviations(&deviations);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.total_magnitude, 45.0);
    }

    #[test]
    fn test_non_anomalous_rows_excluded_from_magnitude() {
        let deviations = vec![dev(105.0, 100.0), dev(95.0, 100.0)];
        let summary = DeviationSummary::from_deviations(&deviations);
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.total_anomalies, 0);
        assert_eq!(summary.total_magnitude, 0.0);
    }

    #[test]
    fn test_observe_matches_from_deviations() {
        let deviations = vec![dev(115.0, 100.0), dev(145.0, 100.0), dev(105.0, 100.0)];
        let batch = DeviationSummary::from_deviations(&deviations);

        let mut streamed = DeviationSummary::default();
        for d in &deviations {
            streamed.observe(d);
        }
        assert_eq!(streamed, batch);
    }

    #[test]
    fn test_merge_order_independent() {
        let a = DeviationSummary::from_deviations(&[dev(115.0, 100.0), dev(200.0, 100.0)]);
        let b = DeviationSummary::from_deviations(&[dev(145.0, 100.0)]);
        let c = DeviationSummary::from_deviations(&[dev(105.0, 100.0), dev(250.0, 100.0)]);

        let mut left = a.clone();
        left.merge(&b);
        left.merge(&c);

        let mut right = c.clone();
        right.merge(&a);
        right.merge(&b);

        assert_eq!(left, right);
        assert_eq!(left.total_anomalies, 4);
    }

    #[test]
    fn test_merge_with_identity_is_noop() {
        let summary = DeviationSummary::from_deviations(&[dev(145.0, 100.0)]);
        let mut merged = summary.clone();
        merged.merge(&DeviationSummary::default());
        assert_eq!(merged, summary);
    }

    #[test]
    fn test_merge_equals_whole_window() {
        let window = vec![
            dev(115.0, 100.0),
            dev(145.0, 100.0),
            dev(200.0, 100.0),
            dev(105.0, 100.0),
        ];
        let whole = DeviationSummary::from_deviations(&window);

        let mut split = DeviationSummary::from_deviations(&window[..2]);
        split.merge(&DeviationSummary::from_deviations(&window[2..]));

        assert_eq!(split, whole);
    }

    #[test]
    fn test_anomaly_rate() {
        let deviations = vec![dev(115.0, 100.0), dev(105.0, 100.0)];
        let summary = DeviationSummary::from_deviations(&deviations);
        assert_eq!(summary.anomaly_rate(), 50.0);
    }

    #[test]
    fn test_severity_count_accessor() {
        let summary = DeviationSummary::from_deviations(&[dev(145.0, 100.0)]);
        assert_eq!(summary.severity_count(Severity::Medium), 1);
        assert_eq!(summary.severity_count(Severity::High), 0);
    }
}
