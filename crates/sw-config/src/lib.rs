//! Spendwatch configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for thresholds.json and policy.json
//! - Config resolution (CLI → env → XDG → defaults)
//! - Schema and semantic validation
//! - Named presets for common deployment postures
//! - Config snapshots for run provenance

pub mod policy;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod thresholds;
pub mod validate;

pub use policy::{DetectionPolicy, InvalidSpendPolicy, MissingForecastPolicy};
pub use preset::{get_preset, list_presets, Preset, PresetInfo, PresetName};
pub use resolve::{ConfigPaths, ConfigResolver};
pub use snapshot::ConfigSnapshot;
pub use thresholds::ThresholdSet;
pub use validate::{ValidationError, ValidationResult};

use sw_common::error::Result;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// The complete loaded configuration for sw-core.
#[derive(Debug, Clone)]
pub struct Config {
    /// Percentage cutoffs for the deviation tiers
    pub thresholds: ThresholdSet,
    /// Join, validation, and persistence policy
    pub policy: DetectionPolicy,
    /// Metadata about how this config was loaded
    pub snapshot: ConfigSnapshot,
}

impl Config {
    /// Load configuration with resolution from CLI, env, or defaults.
    pub fn load(resolver: &ConfigResolver) -> Result<Self> {
        let (thresholds, thresholds_source) = resolver.load_thresholds()?;
        let (policy, policy_source) = resolver.load_policy()?;

        let snapshot =
            ConfigSnapshot::new(&thresholds, &policy, thresholds_source, policy_source)?;

        Ok(Config {
            thresholds,
            policy,
            snapshot,
        })
    }

    /// Load configuration with built-in defaults only.
    /// Used when no config files are found and zero-config mode is acceptable.
    pub fn load_defaults() -> Result<Self> {
        let thresholds = ThresholdSet::default();
        let policy = DetectionPolicy::default();
        let snapshot = ConfigSnapshot::from_defaults(&thresholds, &policy)?;

        Ok(Config {
            thresholds,
            policy,
            snapshot,
        })
    }

    /// Load configuration from a named preset.
    pub fn from_preset(name: PresetName) -> Result<Self> {
        let preset = get_preset(name);
        let snapshot = ConfigSnapshot::from_defaults(&preset.thresholds, &preset.policy)?;

        Ok(Config {
            thresholds: preset.thresholds,
            policy: preset.policy,
            snapshot,
        })
    }

    /// Validate configuration semantically.
    /// Returns Ok(()) if valid, or Err with detailed validation errors.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validate::validate_thresholds(&self.thresholds)?;
        validate::validate_policy(&self.policy)?;
        Ok(())
    }
}

/// Configuration source for a file.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file, or None if using defaults
    pub path: Option<String>,
    /// SHA-256 hash of file contents, or None if defaults
    pub hash: Option<String>,
    /// How this source was resolved
    pub resolution: ConfigResolution,
}

/// How a config file was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigResolution {
    /// From explicit CLI flag
    CliFlag,
    /// From environment variable
    EnvVar,
    /// From XDG config directory
    XdgConfig,
    /// Using built-in defaults
    Default,
}

impl std::fmt::Display for ConfigResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigResolution::CliFlag => write!(f, "cli"),
            ConfigResolution::EnvVar => write!(f, "env"),
            ConfigResolution::XdgConfig => write!(f, "xdg"),
            ConfigResolution::Default => write!(f, "default"),
        }
    }
}
