//! Forecast-vs-actual deviation classification.
//!
//! The classifier is a pure function: given actual spend, forecast spend,
//! and the threshold cutoffs, it computes the signed difference, the
//! absolute percentage deviation, and the tier. No I/O, no errors for
//! finite non-negative input. Validation of raw input happens at the
//! ingestion boundary ([`crate::join`]), never here.

use chrono::{DateTime, Utc};

use sw_common::CampaignId;
use sw_config::ThresholdSet;
use sw_stats::percentage_difference;

use crate::model::{ClassifiedDeviation, DeviationTier};

/// Assign a tier to a deviation percentage.
///
/// Thresholds are checked in descending order with `>=` comparisons, so
/// a percentage exactly at a cutoff lands in the higher tier. Callers
/// are responsible for `l1 <= l2 <= l3`; ordering is not re-checked
/// here.
pub fn assign_tier(pct: f64, thresholds: &ThresholdSet) -> DeviationTier {
    if pct >= thresholds.l3 {
        DeviationTier::L3
    } else if pct >= thresholds.l2 {
        DeviationTier::L2
    } else if pct >= thresholds.l1 {
        DeviationTier::L1
    } else {
        DeviationTier::None
    }
}

/// Classify one campaign-hour against its forecast.
///
/// A zero forecast yields percentage 0 and tier none regardless of the
/// actual value (zero-forecast suppression), so zero-filled rows from
/// the join can never become anomalies.
pub fn classify(
    campaign_id: impl Into<CampaignId>,
    timestamp: DateTime<Utc>,
    actual_spend: f64,
    forecast_spend: f64,
    thresholds: &ThresholdSet,
) -> ClassifiedDeviation {
    let difference = actual_spend - forecast_spend;
    let pct = percentage_difference(actual_spend, forecast_spend);
    let tier = assign_tier(pct, thresholds);

    ClassifiedDeviation {
        campaign_id: campaign_id.into(),
        timestamp,
        actual_spend,
        forecast_spend,
        difference,
        percentage_difference: pct,
        tier,
        severity: tier.severity(),
        is_anomaly: tier.is_anomalous(),
    }
}
