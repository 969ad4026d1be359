//! Domain model for spend deviation detection.
//!
//! The pipeline works over three record families:
//! - Performance observations: actual spend per (campaign, hour)
//! - Forecast observations: predicted spend per (campaign, hour)
//! - Daily analytics rollups: dashboard-level totals per day
//!
//! Input files carry all three in one stream, so ingestion decodes a
//! tagged [`ObservationRecord`] and splits it once. Classification
//! output is a [`ClassifiedDeviation`], immutable after creation.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use sw_common::{CampaignId, ObservationKey};

// ============================================================================
// Severity and Tier
// ============================================================================

/// Anomaly severity assigned by the classifier.
///
/// Variant order matters: derived `Ord` makes `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Tier 1 deviation.
    Low,
    /// Tier 2 deviation.
    Medium,
    /// Tier 3 deviation.
    High,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: &'static [Severity] = &[Severity::Low, Severity::Medium, Severity::High];

    /// Severity name as persisted in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Parse a severity name (accepts common aliases).
    pub fn parse(s: &str) -> Option<Severity> {
        match s.to_lowercase().as_str() {
            "low" | "l1" | "minor" => Some(Severity::Low),
            "medium" | "l2" | "moderate" => Some(Severity::Medium),
            "high" | "l3" | "critical" => Some(Severity::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deviation tier assigned by the threshold cascade.
///
/// Variant order matters: derived `Ord` makes `None < L1 < L2 < L3`,
/// which is what the monotonicity property is stated against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DeviationTier {
    /// Below every threshold; not an anomaly.
    None,
    /// At or above the L1 cutoff.
    L1,
    /// At or above the L2 cutoff.
    L2,
    /// At or above the L3 cutoff.
    L3,
}

impl DeviationTier {
    /// All tiers in ascending order.
    pub const ALL: &'static [DeviationTier] = &[
        DeviationTier::None,
        DeviationTier::L1,
        DeviationTier::L2,
        DeviationTier::L3,
    ];

    /// Tier name as persisted in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviationTier::None => "none",
            DeviationTier::L1 => "l1",
            DeviationTier::L2 => "l2",
            DeviationTier::L3 => "l3",
        }
    }

    /// Parse a tier name.
    pub fn parse(s: &str) -> Option<DeviationTier> {
        match s.to_lowercase().as_str() {
            "none" => Some(DeviationTier::None),
            "l1" => Some(DeviationTier::L1),
            "l2" => Some(DeviationTier::L2),
            "l3" => Some(DeviationTier::L3),
            _ => None,
        }
    }

    /// Whether this tier marks the row as an anomaly.
    pub fn is_anomalous(&self) -> bool {
        *self != DeviationTier::None
    }

    /// The severity this tier maps to.
    ///
    /// `None` maps to `Low` by convention; callers only read severity
    /// when the tier is anomalous.
    pub fn severity(&self) -> Severity {
        match self {
            DeviationTier::None | DeviationTier::L1 => Severity::Low,
            DeviationTier::L2 => Severity::Medium,
            DeviationTier::L3 => Severity::High,
        }
    }
}

impl std::fmt::Display for DeviationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Observations
// ============================================================================

/// Actual spend for one campaign-hour, as reported by the ad platform.
///
/// Engagement counters ride along for dashboard rollups; classification
/// reads only `actual_spend`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceObservation {
    /// Campaign this row belongs to.
    pub campaign_id: CampaignId,

    /// Hour bucket (UTC).
    pub timestamp: DateTime<Utc>,

    /// Actual spend in currency units. Non-negative after validation.
    pub actual_spend: f64,

    /// Clicks in this hour, when the platform reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clicks: Option<u64>,

    /// Impressions in this hour, when the platform reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impressions: Option<u64>,
}

impl PerformanceObservation {
    /// Build an observation carrying only spend.
    pub fn new(campaign_id: impl Into<CampaignId>, timestamp: DateTime<Utc>, actual_spend: f64) -> Self {
        PerformanceObservation {
            campaign_id: campaign_id.into(),
            timestamp,
            actual_spend,
            clicks: None,
            impressions: None,
        }
    }

    /// The exact join key for this row.
    pub fn key(&self) -> ObservationKey {
        ObservationKey::new(self.campaign_id.clone(), self.timestamp)
    }
}

/// Forecast spend for one campaign-hour, produced by the upstream
/// forecasting process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastObservation {
    /// Campaign this forecast covers.
    pub campaign_id: CampaignId,

    /// Hour bucket (UTC).
    pub timestamp: DateTime<Utc>,

    /// Forecast spend in currency units. Non-negative after validation.
    pub forecast_spend: f64,
}

impl ForecastObservation {
    /// Build a forecast row.
    pub fn new(
        campaign_id: impl Into<CampaignId>,
        timestamp: DateTime<Utc>,
        forecast_spend: f64,
    ) -> Self {
        ForecastObservation {
            campaign_id: campaign_id.into(),
            timestamp,
            forecast_spend,
        }
    }

    /// The exact join key for this row.
    pub fn key(&self) -> ObservationKey {
        ObservationKey::new(self.campaign_id.clone(), self.timestamp)
    }
}

/// Daily dashboard rollup: account-wide totals for one calendar day.
///
/// These rows feed metric cards and trends, never the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DailyAnalytics {
    /// Calendar day the totals cover.
    pub date: NaiveDate,

    /// Total spend across all campaigns.
    pub total_ad_spend: f64,

    /// Total clicks across all campaigns.
    pub total_clicks: u64,

    /// Total impressions across all campaigns.
    pub total_impressions: u64,

    /// Distinct users reached.
    pub total_unique_users: u64,

    /// Anomalies classified on this day.
    pub anomalies_detected: u32,

    /// Spend saved by blocking fraudulent traffic.
    pub fraud_prevention_amount: f64,

    /// Forecast accuracy for the day, 0-100.
    pub forecast_accuracy: f64,
}

/// One record from an observation input stream.
///
/// Input files mix performance rows, forecast rows, and daily rollups;
/// the `kind` tag resolves the shape exactly once at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservationRecord {
    /// Actual spend row.
    Performance(PerformanceObservation),
    /// Forecast spend row.
    Forecast(ForecastObservation),
    /// Daily rollup row.
    Daily(DailyAnalytics),
}

impl ObservationRecord {
    /// Record kind as a string (matches the wire tag).
    pub fn kind(&self) -> &'static str {
        match self {
            ObservationRecord::Performance(_) => "performance",
            ObservationRecord::Forecast(_) => "forecast",
            ObservationRecord::Daily(_) => "daily",
        }
    }
}

// ============================================================================
// Classification output
// ============================================================================

/// A classified forecast-vs-actual deviation for one campaign-hour.
///
/// Computed on demand from a joined observation pair and never mutated.
/// Persisting one to the history ledger creates an independent record
/// with no back-reference to the source observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifiedDeviation {
    /// Campaign the deviation belongs to.
    pub campaign_id: CampaignId,

    /// Hour bucket (UTC).
    pub timestamp: DateTime<Utc>,

    /// Actual spend.
    pub actual_spend: f64,

    /// Forecast spend (zero when the forecast was zero-filled).
    pub forecast_spend: f64,

    /// Signed difference: actual - forecast.
    pub difference: f64,

    /// Absolute deviation percentage; 0 when forecast is zero.
    pub percentage_difference: f64,

    /// Assigned tier.
    pub tier: DeviationTier,

    /// Severity derived from the tier.
    pub severity: Severity,

    /// Whether the row crossed the L1 cutoff.
    pub is_anomaly: bool,
}

impl ClassifiedDeviation {
    /// The exact join key for this row.
    pub fn key(&self) -> ObservationKey {
        ObservationKey::new(self.campaign_id.clone(), self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn test_severity_parse_aliases() {
        assert_eq!(Severity::parse("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse("l2"), Some(Severity::Medium));
        assert_eq!(Severity::parse("critical"), Some(Severity::High));
        assert_eq!(Severity::parse("bogus"), None);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(DeviationTier::None < DeviationTier::L1);
        assert!(DeviationTier::L1 < DeviationTier::L2);
        assert!(DeviationTier::L2 < DeviationTier::L3);
    }

    #[test]
    fn test_tier_severity_mapping() {
        assert_eq!(DeviationTier::L1.severity(), Severity::Low);
        assert_eq!(DeviationTier::L2.severity(), Severity::Medium);
        assert_eq!(DeviationTier::L3.severity(), Severity::High);
    }

    #[test]
    fn test_tier_anomalous() {
        assert!(!DeviationTier::None.is_anomalous());
        assert!(DeviationTier::L1.is_anomalous());
        assert!(DeviationTier::L3.is_anomalous());
    }

    #[test]
    fn test_tier_roundtrip() {
        for tier in DeviationTier::ALL {
            assert_eq!(DeviationTier::parse(tier.as_str()), Some(*tier));
        }
    }

    #[test]
    fn test_severity_serde_snake_case() {
        let json = serde_json::to_string(&Severity::Medium).unwrap();
        assert_eq!(json, r#""medium""#);
        let back: Severity = serde_json::from_str(r#""high""#).unwrap();
        assert_eq!(back, Severity::High);
    }

    #[test]
    fn test_observation_keys_match_when_aligned() {
        let perf = PerformanceObservation::new("camp-001", ts(), 115.0);
        let fcast = ForecastObservation::new("camp-001", ts(), 100.0);
        assert_eq!(perf.key(), fcast.key());
    }

    #[test]
    fn test_record_tagged_decode() {
        let json = r#"{
            "kind": "performance",
            "campaign_id": "camp-001",
            "timestamp": "2026-01-15T14:00:00Z",
            "actual_spend": 115.0
        }"#;
        let record: ObservationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind(), "performance");
        match record {
            ObservationRecord::Performance(p) => {
                assert_eq!(p.campaign_id.as_str(), "camp-001");
                assert_eq!(p.actual_spend, 115.0);
                assert_eq!(p.clicks, None);
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_record_forecast_decode() {
        let json = r#"{
            "kind": "forecast",
            "campaign_id": "camp-001",
            "timestamp": "2026-01-15T14:00:00Z",
            "forecast_spend": 100.0
        }"#;
        let record: ObservationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind(), "forecast");
    }

    #[test]
    fn test_record_daily_decode() {
        let json = r#"{
            "kind": "daily",
            "date": "2026-01-15",
            "total_ad_spend": 8942.0,
            "total_clicks": 14856,
            "total_impressions": 403210,
            "total_unique_users": 9120,
            "anomalies_detected": 3,
            "fraud_prevention_amount": 412.5,
            "forecast_accuracy": 93.4
        }"#;
        let record: ObservationRecord = serde_json::from_str(json).unwrap();
        match record {
            ObservationRecord::Daily(d) => {
                assert_eq!(d.total_clicks, 14856);
                assert_eq!(d.anomalies_detected, 3);
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_record_unknown_kind_rejected() {
        let json = r#"{"kind": "mystery", "campaign_id": "c1"}"#;
        assert!(serde_json::from_str::<ObservationRecord>(json).is_err());
    }

    #[test]
    fn test_record_roundtrip_keeps_tag() {
        let record = ObservationRecord::Forecast(ForecastObservation::new("camp-002", ts(), 50.0));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""kind":"forecast""#));
        let back: ObservationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
