//! Configuration presets for common monitoring postures.
//!
//! Provides pre-built configurations for:
//! - Standard: default thresholds, zero-fill join, 90-day history
//! - Sensitive: tighter thresholds, excluded missing forecasts
//! - Tolerant: wider thresholds, clamped negative spend, short history
//! - Audit: default thresholds, excluded missing forecasts, long history

use crate::policy::{DetectionPolicy, InvalidSpendPolicy, MissingForecastPolicy};
use crate::thresholds::ThresholdSet;
use crate::CONFIG_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Default thresholds, zero-fill join, 90-day history
    Standard,
    /// Tighter thresholds, missing forecasts excluded from classification
    Sensitive,
    /// Wider thresholds, negative spend clamped, shorter history
    Tolerant,
    /// Default thresholds, excluded missing forecasts, year-long history
    Audit,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[
        PresetName::Standard,
        PresetName::Sensitive,
        PresetName::Tolerant,
        PresetName::Audit,
    ];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Standard => "standard",
            PresetName::Sensitive => "sensitive",
            PresetName::Tolerant => "tolerant",
            PresetName::Audit => "audit",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "standard" | "default" | "std" => Some(PresetName::Standard),
            "sensitive" | "tight" | "aggressive" => Some(PresetName::Sensitive),
            "tolerant" | "loose" | "relaxed" => Some(PresetName::Tolerant),
            "audit" | "compliance" => Some(PresetName::Audit),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Standard => "Default 15/30/50 thresholds, zero-fill join, 90-day history",
            PresetName::Sensitive => {
                "Tight 10/20/35 thresholds, missing forecasts excluded, for volatile accounts"
            }
            PresetName::Tolerant => {
                "Wide 25/50/100 thresholds, negative spend clamped, for noisy feeds"
            }
            PresetName::Audit => "Default thresholds, excluded missing forecasts, 365-day history",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// A complete preset: thresholds plus detection policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub thresholds: ThresholdSet,
    pub policy: DetectionPolicy,
}

/// Get the configuration for a preset.
pub fn get_preset(name: PresetName) -> Preset {
    match name {
        PresetName::Standard => standard_preset(),
        PresetName::Sensitive => sensitive_preset(),
        PresetName::Tolerant => tolerant_preset(),
        PresetName::Audit => audit_preset(),
    }
}

/// Standard preset: the shipped defaults.
fn standard_preset() -> Preset {
    Preset {
        thresholds: ThresholdSet::default(),
        policy: DetectionPolicy::default(),
    }
}

/// Sensitive preset: tighter tiers, no silent zero-fill.
///
/// Characteristics:
/// - Thresholds 10 / 20 / 35
/// - Missing forecasts excluded so they surface in the join report
/// - Negative spend still rejected
fn sensitive_preset() -> Preset {
    Preset {
        thresholds: ThresholdSet {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            l1: 10.0,
            l2: 20.0,
            l3: 35.0,
        },
        policy: DetectionPolicy {
            missing_forecast: MissingForecastPolicy::Exclude,
            ..DetectionPolicy::default()
        },
    }
}

/// Tolerant preset: wider tiers for feeds with known jitter.
///
/// Characteristics:
/// - Thresholds 25 / 50 / 100
/// - Negative spend clamped to zero instead of rejected
/// - 30-day history retention
fn tolerant_preset() -> Preset {
    Preset {
        thresholds: ThresholdSet {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            l1: 25.0,
            l2: 50.0,
            l3: 100.0,
        },
        policy: DetectionPolicy {
            invalid_spend: InvalidSpendPolicy::Clamp,
            retention_days: 30,
            ..DetectionPolicy::default()
        },
    }
}

/// Audit preset: default tiers, maximum traceability.
///
/// Characteristics:
/// - Default thresholds 15 / 30 / 50
/// - Missing forecasts excluded (never silently classified)
/// - 365-day history retention
fn audit_preset() -> Preset {
    Preset {
        thresholds: ThresholdSet::default(),
        policy: DetectionPolicy {
            missing_forecast: MissingForecastPolicy::Exclude,
            retention_days: 365,
            ..DetectionPolicy::default()
        },
    }
}

/// Information about a preset for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: String,
    pub description: String,
    pub l1: f64,
    pub l2: f64,
    pub l3: f64,
    pub missing_forecast: MissingForecastPolicy,
    pub invalid_spend: InvalidSpendPolicy,
    pub record_anomalies: bool,
    pub retention_days: u32,
}

impl PresetInfo {
    /// Create info from a preset.
    pub fn from_preset(name: PresetName) -> Self {
        let preset = get_preset(name);
        Self {
            name: name.as_str().to_string(),
            description: name.description().to_string(),
            l1: preset.thresholds.l1,
            l2: preset.thresholds.l2,
            l3: preset.thresholds.l3,
            missing_forecast: preset.policy.missing_forecast,
            invalid_spend: preset.policy.invalid_spend,
            record_anomalies: preset.policy.record_anomalies,
            retention_days: preset.policy.retention_days,
        }
    }
}

/// List all available presets with summary information.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|&name| PresetInfo::from_preset(name))
        .collect()
}
