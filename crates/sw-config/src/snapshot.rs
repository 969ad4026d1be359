//! Configuration snapshots for run provenance.
//!
//! Captures a complete snapshot of the active configuration including:
//! - File paths and hashes
//! - Schema versions
//! - Resolution method
//! - Effective values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::policy::DetectionPolicy;
use crate::thresholds::ThresholdSet;
use crate::{ConfigResolution, ConfigSource};
use sw_common::error::{Error, Result};

/// Complete configuration snapshot for run provenance and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Timestamp when snapshot was created
    pub snapshot_at: DateTime<Utc>,

    /// Combined hash of all config content
    pub combined_hash: String,

    /// Thresholds source information
    pub thresholds_source: SourceInfo,

    /// Policy source information
    pub policy_source: SourceInfo,

    /// Active schema versions
    pub schema_versions: SchemaVersions,
}

impl ConfigSnapshot {
    /// Create a new snapshot from loaded configs.
    pub fn new(
        thresholds: &ThresholdSet,
        policy: &DetectionPolicy,
        thresholds_source: ConfigSource,
        policy_source: ConfigSource,
    ) -> Result<Self> {
        let now = Utc::now();

        // Compute combined hash
        let thresholds_json = serde_json::to_string(thresholds)
            .map_err(|e| Error::Config(format!("failed to serialize thresholds: {}", e)))?;
        let policy_json = serde_json::to_string(policy)
            .map_err(|e| Error::Config(format!("failed to serialize policy: {}", e)))?;

        let combined_hash = compute_combined_hash(&thresholds_json, &policy_json);

        Ok(ConfigSnapshot {
            snapshot_at: now,
            combined_hash,
            thresholds_source: SourceInfo::from_config_source(thresholds_source),
            policy_source: SourceInfo::from_config_source(policy_source),
            schema_versions: SchemaVersions {
                thresholds: thresholds.schema_version.clone(),
                policy: policy.schema_version.clone(),
            },
        })
    }

    /// Create a snapshot for built-in defaults.
    pub fn from_defaults(thresholds: &ThresholdSet, policy: &DetectionPolicy) -> Result<Self> {
        ConfigSnapshot::new(
            thresholds,
            policy,
            ConfigSource {
                path: None,
                hash: None,
                resolution: ConfigResolution::Default,
            },
            ConfigSource {
                path: None,
                hash: None,
                resolution: ConfigResolution::Default,
            },
        )
    }

    /// Return true if both configs are from defaults.
    pub fn is_default(&self) -> bool {
        self.thresholds_source.resolution == "default"
            && self.policy_source.resolution == "default"
    }
}

/// Source information for a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Path to the file (None if defaults)
    pub path: Option<String>,

    /// SHA-256 hash of file content (None if defaults)
    pub hash: Option<String>,

    /// How the config was resolved
    pub resolution: String,
}

impl SourceInfo {
    fn from_config_source(source: ConfigSource) -> Self {
        SourceInfo {
            path: source.path,
            hash: source.hash,
            resolution: source.resolution.to_string(),
        }
    }
}

/// Schema versions for loaded configs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaVersions {
    pub thresholds: String,
    pub policy: String,
}

/// Compute a combined hash from multiple config strings.
fn compute_combined_hash(thresholds: &str, policy: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"thresholds:");
    hasher.update(thresholds.as_bytes());
    hasher.update(b":policy:");
    hasher.update(policy.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}
