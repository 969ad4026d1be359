//! Deviation tier thresholds.
//!
//! Three ascending percentage cutoffs partition deviations into tiers:
//! below `l1` is quiet, `[l1, l2)` is tier 1, `[l2, l3)` is tier 2 and
//! `l3` upward is tier 3. Boundary values belong to the higher tier.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate::{validate_thresholds, ValidationResult};
use crate::CONFIG_SCHEMA_VERSION;

/// Percentage cutoffs for the three deviation tiers.
///
/// Loaded from `thresholds.json`; falls back to {15, 30, 50}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThresholdSet {
    /// Config file schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Tier 1 cutoff in percent. Deviations at or above it are anomalies.
    pub l1: f64,

    /// Tier 2 cutoff in percent.
    pub l2: f64,

    /// Tier 3 cutoff in percent. Deviations at or above it are high severity.
    pub l3: f64,
}

fn default_schema_version() -> String {
    CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for ThresholdSet {
    fn default() -> Self {
        ThresholdSet {
            schema_version: default_schema_version(),
            l1: 15.0,
            l2: 30.0,
            l3: 50.0,
        }
    }
}

impl ThresholdSet {
    /// Build a threshold set from raw cutoffs without validation.
    ///
    /// The classifier does not check ordering; call [`ThresholdSet::validate`]
    /// at the boundary if the cutoffs come from untrusted input.
    pub fn new(l1: f64, l2: f64, l3: f64) -> Self {
        ThresholdSet {
            schema_version: default_schema_version(),
            l1,
            l2,
            l3,
        }
    }

    /// Validate the cutoffs semantically (finite, non-negative, ascending).
    pub fn validate(&self) -> ValidationResult<()> {
        validate_thresholds(self)
    }
}
