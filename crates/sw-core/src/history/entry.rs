//! Anomaly record structure for the history ledger.

use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sw_common::{CampaignId, RunId, SCHEMA_VERSION};

use super::HistoryError;
use crate::model::{ClassifiedDeviation, DeviationTier, Severity};

/// One persisted anomaly.
///
/// Records are independent historical entities: they carry the values
/// and labels they were written with and no back-reference to the
/// source observations. `campaign` is the display label resolved at
/// write time; `campaign_id` is the raw join key for filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnomalyRecord {
    /// Ledger schema version for forward-compatible readers.
    pub schema_version: String,

    /// Unique record id.
    pub record_id: Uuid,

    /// When the record was appended.
    pub recorded_at: DateTime<Utc>,

    /// Detection run that produced the record.
    pub run_id: RunId,

    /// Campaign display label at write time.
    pub campaign: String,

    /// Campaign join key.
    pub campaign_id: CampaignId,

    /// Observation hour as an RFC 3339 string.
    pub time: String,

    /// Actual spend.
    pub value: f64,

    /// Forecast spend.
    pub expected: f64,

    /// Anomaly severity.
    pub severity: Severity,

    /// Deviation tier.
    pub tier: DeviationTier,

    /// Absolute deviation percentage.
    pub percentage: f64,
}

impl AnomalyRecord {
    /// Build a record from a classified deviation.
    ///
    /// `campaign` is the display label; pass the raw id when no lookup
    /// is available. `recorded_at` is stamped with the current time.
    pub fn from_deviation(
        deviation: &ClassifiedDeviation,
        campaign: &str,
        run_id: &RunId,
    ) -> AnomalyRecord {
        AnomalyRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            record_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            run_id: run_id.clone(),
            campaign: campaign.to_string(),
            campaign_id: deviation.campaign_id.clone(),
            time: deviation
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            value: deviation.actual_spend,
            expected: deviation.forecast_spend,
            severity: deviation.severity,
            tier: deviation.tier,
            percentage: deviation.percentage_difference,
        }
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, HistoryError> {
        serde_json::to_string(self).map_err(|source| HistoryError::Serialization { source })
    }

    /// Whether the record matches a campaign query by id or label.
    pub fn matches_campaign(&self, query: &str) -> bool {
        self.campaign_id.as_str() == query || self.campaign == query
    }
}
