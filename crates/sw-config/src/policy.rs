//! Detection policy: join behavior, input validation, and persistence.
//!
//! The policy governs everything around the pure classifier: what to do
//! with performance rows that have no matching forecast, how to treat
//! invalid spend values at ingestion, and whether classified anomalies
//! are appended to the history ledger.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validate::{validate_policy, ValidationResult};
use crate::CONFIG_SCHEMA_VERSION;

/// How to treat a performance observation with no matching forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingForecastPolicy {
    /// Substitute a zero forecast. The row is classified but can never be
    /// an anomaly (zero-forecast suppression). Matches the historical
    /// dashboard behavior.
    #[default]
    ZeroFill,

    /// Exclude the row from classification and from aggregate
    /// denominators; it is counted in the join report instead.
    Exclude,
}

impl MissingForecastPolicy {
    /// All policies, for help text and validation messages.
    pub const ALL: &'static [MissingForecastPolicy] =
        &[MissingForecastPolicy::ZeroFill, MissingForecastPolicy::Exclude];

    /// Policy name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingForecastPolicy::ZeroFill => "zero_fill",
            MissingForecastPolicy::Exclude => "exclude",
        }
    }

    /// Parse a policy name, accepting common aliases.
    pub fn parse(s: &str) -> Option<MissingForecastPolicy> {
        match s.to_lowercase().as_str() {
            "zero_fill" | "zerofill" | "zero" => Some(MissingForecastPolicy::ZeroFill),
            "exclude" | "skip" | "unknown" => Some(MissingForecastPolicy::Exclude),
            _ => None,
        }
    }
}

impl fmt::Display for MissingForecastPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How to treat negative spend values at ingestion.
///
/// Non-finite values (NaN, infinity) are rejected under every policy;
/// only the negative case is policy-controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvalidSpendPolicy {
    /// Reject the observation with a typed validation error.
    #[default]
    Reject,

    /// Clamp negative spend to zero and continue.
    Clamp,
}

impl InvalidSpendPolicy {
    /// All policies, for help text and validation messages.
    pub const ALL: &'static [InvalidSpendPolicy] =
        &[InvalidSpendPolicy::Reject, InvalidSpendPolicy::Clamp];

    /// Policy name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidSpendPolicy::Reject => "reject",
            InvalidSpendPolicy::Clamp => "clamp",
        }
    }

    /// Parse a policy name, accepting common aliases.
    pub fn parse(s: &str) -> Option<InvalidSpendPolicy> {
        match s.to_lowercase().as_str() {
            "reject" | "strict" => Some(InvalidSpendPolicy::Reject),
            "clamp" | "clamp_to_zero" | "lenient" => Some(InvalidSpendPolicy::Clamp),
            _ => None,
        }
    }
}

impl fmt::Display for InvalidSpendPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detection policy loaded from `policy.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionPolicy {
    /// Config file schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Handling of performance rows with no matching forecast.
    #[serde(default)]
    pub missing_forecast: MissingForecastPolicy,

    /// Handling of negative spend values at ingestion.
    #[serde(default)]
    pub invalid_spend: InvalidSpendPolicy,

    /// Append classified anomalies to the history ledger.
    #[serde(default = "default_record_anomalies")]
    pub record_anomalies: bool,

    /// Days of anomaly history to keep before pruning.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_schema_version() -> String {
    CONFIG_SCHEMA_VERSION.to_string()
}

fn default_record_anomalies() -> bool {
    true
}

fn default_retention_days() -> u32 {
    90
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        DetectionPolicy {
            schema_version: default_schema_version(),
            missing_forecast: MissingForecastPolicy::default(),
            invalid_spend: InvalidSpendPolicy::default(),
            record_anomalies: default_record_anomalies(),
            retention_days: default_retention_days(),
        }
    }
}

impl DetectionPolicy {
    /// Validate the policy semantically.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_policy(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let p = DetectionPolicy::default();
        assert_eq!(p.missing_forecast, MissingForecastPolicy::ZeroFill);
        assert_eq!(p.invalid_spend, InvalidSpendPolicy::Reject);
        assert!(p.record_anomalies);
        assert_eq!(p.retention_days, 90);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_missing_forecast_parse_aliases() {
        assert_eq!(
            MissingForecastPolicy::parse("zero_fill"),
            Some(MissingForecastPolicy::ZeroFill)
        );
        assert_eq!(
            MissingForecastPolicy::parse("zero"),
            Some(MissingForecastPolicy::ZeroFill)
        );
        assert_eq!(
            MissingForecastPolicy::parse("exclude"),
            Some(MissingForecastPolicy::Exclude)
        );
        assert_eq!(
            MissingForecastPolicy::parse("skip"),
            Some(MissingForecastPolicy::Exclude)
        );
        assert_eq!(MissingForecastPolicy::parse("bogus"), None);
    }

    #[test]
    fn test_invalid_spend_parse_aliases() {
        assert_eq!(
            InvalidSpendPolicy::parse("reject"),
            Some(InvalidSpendPolicy::Reject)
        );
        assert_eq!(
            InvalidSpendPolicy::parse("strict"),
            Some(InvalidSpendPolicy::Reject)
        );
        assert_eq!(
            InvalidSpendPolicy::parse("clamp"),
            Some(InvalidSpendPolicy::Clamp)
        );
        assert_eq!(
            InvalidSpendPolicy::parse("LENIENT"),
            Some(InvalidSpendPolicy::Clamp)
        );
        assert_eq!(InvalidSpendPolicy::parse(""), None);
    }

    #[test]
    fn test_policy_serde_snake_case() {
        let p = DetectionPolicy {
            missing_forecast: MissingForecastPolicy::Exclude,
            ..DetectionPolicy::default()
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains(r#""missing_forecast":"exclude""#));
        assert!(json.contains(r#""invalid_spend":"reject""#));
    }

    #[test]
    fn test_policy_deserialize_sparse() {
        // Only overrides present; the rest fall back to defaults.
        let p: DetectionPolicy =
            serde_json::from_str(r#"{"missing_forecast": "exclude"}"#).unwrap();
        assert_eq!(p.missing_forecast, MissingForecastPolicy::Exclude);
        assert_eq!(p.invalid_spend, InvalidSpendPolicy::Reject);
        assert_eq!(p.retention_days, 90);
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(MissingForecastPolicy::ZeroFill.to_string(), "zero_fill");
        assert_eq!(InvalidSpendPolicy::Clamp.to_string(), "clamp");
    }
}
