//! Forecast/actual join and ingestion validation.
//!
//! Pairing is by exact [`ObservationKey`] (campaign id + hour bucket),
//! no tolerance window. What happens to performance rows without a
//! matching forecast is policy-controlled: `zero_fill` substitutes a
//! zero forecast (the row classifies but can never be an anomaly),
//! `exclude` drops the row from classification and from aggregate
//! denominators. Either way the [`JoinReport`] records how much of the
//! window had forecast coverage.
//!
//! Spend validation also lives here: it runs once at the ingestion
//! boundary so the classifier downstream only ever sees finite,
//! non-negative numbers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use sw_common::{CampaignId, Error, ObservationKey, Result};
use sw_config::{InvalidSpendPolicy, MissingForecastPolicy};

use crate::model::{ForecastObservation, PerformanceObservation};

// ============================================================================
// Joined pairs
// ============================================================================

/// One performance row paired with its forecast, ready to classify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JoinedPair {
    /// Campaign this pair belongs to.
    pub campaign_id: CampaignId,

    /// Hour bucket (UTC).
    pub timestamp: DateTime<Utc>,

    /// Actual spend from the performance row.
    pub actual_spend: f64,

    /// Forecast spend; zero when the forecast was zero-filled.
    pub forecast_spend: f64,

    /// Whether the forecast was absent and zero-filled.
    pub forecast_missing: bool,
}

/// Forecast coverage accounting for one join pass.
///
/// `matched + zero_filled + excluded` equals the number of performance
/// rows seen; `matched + zero_filled` equals the number of pairs that
/// went on to classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct JoinReport {
    /// Performance rows with an exact forecast match.
    pub matched: usize,

    /// Performance rows classified against a substituted zero forecast.
    pub zero_filled: usize,

    /// Performance rows excluded from classification.
    pub excluded: usize,
}

impl JoinReport {
    /// Performance rows seen by the join.
    pub fn total_rows(&self) -> usize {
        self.matched + self.zero_filled + self.excluded
    }

    /// Rows that went on to classification.
    pub fn classified_rows(&self) -> usize {
        self.matched + self.zero_filled
    }

    /// Fraction of performance rows with a real forecast, 0-100.
    ///
    /// An empty window counts as fully covered.
    pub fn forecast_coverage(&self) -> f64 {
        let total = self.total_rows();
        if total == 0 {
            return 100.0;
        }
        self.matched as f64 / total as f64 * 100.0
    }

    /// Fold another report into this one. Used when joining per
    /// campaign and reporting per window.
    pub fn merge(&mut self, other: &JoinReport) {
        self.matched += other.matched;
        self.zero_filled += other.zero_filled;
        self.excluded += other.excluded;
    }
}

/// Pair performance rows with forecasts sharing the same exact key.
///
/// Output order follows the performance input. Duplicate forecast keys
/// keep the last row, matching an upsert-style forecast feed.
pub fn join_observations(
    performance: &[PerformanceObservation],
    forecasts: &[ForecastObservation],
    policy: MissingForecastPolicy,
) -> (Vec<JoinedPair>, JoinReport) {
    let mut by_key: HashMap<ObservationKey, f64> = HashMap::with_capacity(forecasts.len());
    for f in forecasts {
        by_key.insert(f.key(), f.forecast_spend);
    }

    let mut pairs = Vec::with_capacity(performance.len());
    let mut report = JoinReport::default();

    for p in performance {
        match by_key.get(&p.key()) {
            Some(&forecast_spend) => {
                report.matched += 1;
                pairs.push(JoinedPair {
                    campaign_id: p.campaign_id.clone(),
                    timestamp: p.timestamp,
                    actual_spend: p.actual_spend,
                    forecast_spend,
                    forecast_missing: false,
                });
            }
            None => match policy {
                MissingForecastPolicy::ZeroFill => {
                    report.zero_filled += 1;
                    pairs.push(JoinedPair {
                        campaign_id: p.campaign_id.clone(),
                        timestamp: p.timestamp,
                        actual_spend: p.actual_spend,
                        forecast_spend: 0.0,
                        forecast_missing: true,
                    });
                }
                MissingForecastPolicy::Exclude => {
                    report.excluded += 1;
                }
            },
        }
    }

    (pairs, report)
}

// ============================================================================
// Ingestion validation
// ============================================================================

/// Validate one spend value at the ingestion boundary.
///
/// Non-finite values are rejected under every policy. Negative values
/// are rejected or clamped to zero per `policy`; a clamp is logged so
/// the row does not silently change meaning.
pub fn validate_spend(
    campaign_id: &CampaignId,
    field: &'static str,
    value: f64,
    policy: InvalidSpendPolicy,
) -> Result<f64> {
    if !value.is_finite() {
        return Err(Error::NonFiniteSpend {
            campaign_id: campaign_id.as_str().to_string(),
            field: field.to_string(),
        });
    }
    if value < 0.0 {
        return match policy {
            InvalidSpendPolicy::Reject => Err(Error::NegativeSpend {
                campaign_id: campaign_id.as_str().to_string(),
                field: field.to_string(),
                value,
            }),
            InvalidSpendPolicy::Clamp => {
                warn!(
                    campaign = %campaign_id,
                    field,
                    value,
                    "clamped negative spend to zero"
                );
                Ok(0.0)
            }
        };
    }
    Ok(value)
}

/// Validate a batch of performance rows, clamping in place when the
/// policy allows it.
pub fn validate_performance(
    mut rows: Vec<PerformanceObservation>,
    policy: InvalidSpendPolicy,
) -> Result<Vec<PerformanceObservation>> {
    for row in &mut rows {
        row.actual_spend = validate_spend(&row.campaign_id, "actual_spend", row.actual_spend, policy)?;
    }
    Ok(rows)
}

/// Validate a batch of forecast rows, clamping in place when the
/// policy allows it.
pub fn validate_forecasts(
    mut rows: Vec<ForecastObservation>,
    policy: InvalidSpendPolicy,
) -> Result<Vec<ForecastObservation>> {
    for row in &mut rows {
        row.forecast_spend =
            validate_spend(&row.campaign_id, "forecast_spend", row.forecast_spend, policy)?;
    }
    Ok(rows)
}
