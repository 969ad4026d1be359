//! JSON Schema generation for wire types.
//!
//! Everything sw-core writes as JSON (reports, ledger records, config
//! files) has a schema here, so downstream consumers can validate
//! output and generate bindings without reading Rust source.
//!
//! # Usage
//!
//! ```bash
//! # List available schema types
//! sw-core schema --list
//!
//! # Generate schema for a specific type
//! sw-core schema DetectionReport
//! sw-core schema AnomalyRecord
//!
//! # Generate all schemas
//! sw-core schema --all
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

// Re-export types that have schemas
pub use crate::aggregate::DeviationSummary;
pub use crate::escalation::{AlertLevel, EscalationDecision, EscalationState};
pub use crate::history::{AnomalyRecord, PruneReport};
pub use crate::join::{JoinReport, JoinedPair};
pub use crate::model::{
    ClassifiedDeviation, DailyAnalytics, DeviationTier, ForecastObservation, ObservationRecord,
    PerformanceObservation, Severity,
};
pub use crate::pipeline::{CampaignResult, DetectionReport};
pub use crate::report::{
    ForecastEvent, ForecastStatistics, Incident, IncidentStatistics, IncidentStatus,
};
pub use crate::source::TimeWindow;
pub use sw_common::error::{BatchError, BatchSummary, StructuredError};
pub use sw_common::{CampaignId, ObservationKey, RunId};
pub use sw_config::{DetectionPolicy, ThresholdSet};

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        // Core identity types
        ("CampaignId", "Campaign identifier"),
        ("ObservationKey", "Exact (campaign, timestamp) join key"),
        ("RunId", "Detection run identifier"),
        // Observation types
        (
            "PerformanceObservation",
            "Actual spend for one campaign-hour",
        ),
        ("ForecastObservation", "Forecast spend for one campaign-hour"),
        ("DailyAnalytics", "Daily dashboard rollup"),
        (
            "ObservationRecord",
            "Tagged observation union as read from input files",
        ),
        // Classification types
        ("Severity", "Anomaly severity (low, medium, high)"),
        ("DeviationTier", "Deviation tier (none, l1, l2, l3)"),
        (
            "ClassifiedDeviation",
            "One classified campaign-hour with tier and severity",
        ),
        ("JoinedPair", "Performance row paired with its forecast"),
        ("JoinReport", "Join accounting (matched, zero-filled, excluded)"),
        ("DeviationSummary", "Aggregated anomaly counts and magnitude"),
        // Pipeline types
        ("TimeWindow", "Inclusive observation window"),
        ("CampaignResult", "Per-campaign outcome of a detection run"),
        (
            "DetectionReport",
            "Complete detection run result with summary and failures",
        ),
        // History types
        ("AnomalyRecord", "Persisted anomaly ledger entry"),
        ("PruneReport", "Outcome of a retention prune"),
        // Escalation types
        ("AlertLevel", "Alert escalation level (L1, L2, L3)"),
        ("EscalationState", "Open alert with escalation bookkeeping"),
        (
            "EscalationDecision",
            "Escalation verdict (hold, escalate, exhausted)",
        ),
        // Dashboard statistics types
        ("Incident", "Fraud/anomaly incident record"),
        ("IncidentStatus", "Incident lifecycle status"),
        ("IncidentStatistics", "Aggregated incident counts"),
        ("ForecastEvent", "Upcoming forecast calendar event"),
        ("ForecastStatistics", "Aggregated forecast event totals"),
        // Configuration types
        ("ThresholdSet", "Deviation tier thresholds (thresholds.json)"),
        ("DetectionPolicy", "Join and validation policy (policy.json)"),
        // Error types
        ("StructuredError", "Machine-parseable error envelope"),
        ("BatchError", "Per-item failure in a batch operation"),
        ("BatchSummary", "Batch operation counters"),
    ]
}

/// Generate JSON Schema for a type by name.
///
/// Returns the schema as a serde_json::Value, or None if the type is unknown.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        // Core identity types
        "CampaignId" => schema_for!(CampaignId),
        "ObservationKey" => schema_for!(ObservationKey),
        "RunId" => schema_for!(RunId),
        // Observation types
        "PerformanceObservation" => schema_for!(PerformanceObservation),
        "ForecastObservation" => schema_for!(ForecastObservation),
        "DailyAnalytics" => schema_for!(DailyAnalytics),
        "ObservationRecord" => schema_for!(ObservationRecord),
        // Classification types
        "Severity" => schema_for!(Severity),
        "DeviationTier" => schema_for!(DeviationTier),
        "ClassifiedDeviation" => schema_for!(ClassifiedDeviation),
        "JoinedPair" => schema_for!(JoinedPair),
        "JoinReport" => schema_for!(JoinReport),
        "DeviationSummary" => schema_for!(DeviationSummary),
        // Pipeline types
        "TimeWindow" => schema_for!(TimeWindow),
        "CampaignResult" => schema_for!(CampaignResult),
        "DetectionReport" => schema_for!(DetectionReport),
        // History types
        "AnomalyRecord" => schema_for!(AnomalyRecord),
        "PruneReport" => schema_for!(PruneReport),
        // Escalation types
        "AlertLevel" => schema_for!(AlertLevel),
        "EscalationState" => schema_for!(EscalationState),
        "EscalationDecision" => schema_for!(EscalationDecision),
        // Dashboard statistics types
        "Incident" => schema_for!(Incident),
        "IncidentStatus" => schema_for!(IncidentStatus),
        "IncidentStatistics" => schema_for!(IncidentStatistics),
        "ForecastEvent" => schema_for!(ForecastEvent),
        "ForecastStatistics" => schema_for!(ForecastStatistics),
        // Configuration types
        "ThresholdSet" => schema_for!(ThresholdSet),
        "DetectionPolicy" => schema_for!(DetectionPolicy),
        // Error types
        "StructuredError" => schema_for!(StructuredError),
        "BatchError" => schema_for!(BatchError),
        "BatchSummary" => schema_for!(BatchSummary),
        _ => return None,
    };

    Some(serde_json::to_value(schema).expect("schema serialization should not fail"))
}

/// Generate all schemas as a map from type name to schema.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    let mut schemas = BTreeMap::new();
    for (name, _desc) in available_schemas() {
        if let Some(schema) = generate_schema(name) {
            schemas.insert(name.to_string(), schema);
        }
    }
    schemas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_schemas_generate() {
        // Every listed schema should generate successfully
        for (name, _desc) in available_schemas() {
            let schema = generate_schema(name);
            assert!(schema.is_some(), "Schema for '{}' should generate", name);
        }
    }

    #[test]
    fn test_unknown_schema_returns_none() {
        assert!(generate_schema("UnknownType").is_none());
        assert!(generate_schema("").is_none());
    }

    #[test]
    fn test_schema_has_required_fields() {
        let schema = generate_schema("AnomalyRecord").unwrap();
        assert!(
            schema.get("$schema").is_some() || schema.get("type").is_some(),
            "Schema should have $schema or type field"
        );
    }

    #[test]
    fn test_generate_all_schemas() {
        let all = generate_all_schemas();
        assert_eq!(all.len(), available_schemas().len());

        assert!(all.contains_key("DetectionReport"));
        assert!(all.contains_key("AnomalyRecord"));
        assert!(all.contains_key("ClassifiedDeviation"));
    }

    #[test]
    fn test_deviation_schema_lists_fields() {
        let schema = generate_schema("ClassifiedDeviation").unwrap();
        let props = schema
            .get("properties")
            .and_then(|p| p.as_object())
            .expect("object schema");
        assert!(props.contains_key("percentage_difference"));
        assert!(props.contains_key("tier"));
        assert!(props.contains_key("is_anomaly"));
    }
}
