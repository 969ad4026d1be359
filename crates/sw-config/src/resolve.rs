//! Configuration resolution for Spendwatch.
//!
//! Implements deterministic config resolution order:
//! 1. Explicit CLI flags (--config-dir, --thresholds, --policy)
//! 2. Environment variables (SPENDWATCH_CONFIG, XDG_CONFIG_HOME)
//! 3. XDG default (~/.config/spendwatch/)
//! 4. Built-in defaults

use std::env;
use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::policy::DetectionPolicy;
use crate::thresholds::ThresholdSet;
use crate::{ConfigResolution, ConfigSource};
use sw_common::error::{Error, Result};

/// Configuration file paths.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Directory containing config files
    pub config_dir: Option<PathBuf>,
    /// Explicit path to thresholds.json
    pub thresholds_path: Option<PathBuf>,
    /// Explicit path to policy.json
    pub policy_path: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        ConfigPaths {
            config_dir: None,
            thresholds_path: None,
            policy_path: None,
        }
    }
}

/// Configuration resolver with deterministic resolution order.
#[derive(Debug)]
pub struct ConfigResolver {
    /// Paths from CLI flags
    cli_paths: ConfigPaths,
}

impl ConfigResolver {
    /// Create a new resolver with CLI paths.
    pub fn new(paths: ConfigPaths) -> Self {
        ConfigResolver { cli_paths: paths }
    }

    /// Create a resolver with no CLI overrides.
    pub fn with_defaults() -> Self {
        ConfigResolver {
            cli_paths: ConfigPaths::default(),
        }
    }

    /// Resolve the config directory path.
    pub fn resolve_config_dir(&self) -> Option<PathBuf> {
        // 1. CLI flag
        if let Some(ref dir) = self.cli_paths.config_dir {
            return Some(dir.clone());
        }

        // 2. SPENDWATCH_CONFIG env var
        if let Ok(dir) = env::var("SPENDWATCH_CONFIG") {
            return Some(PathBuf::from(dir));
        }

        // 3. XDG_CONFIG_HOME/spendwatch
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("spendwatch"));
        }

        // 4. ~/.config/spendwatch (XDG default)
        dirs::config_dir().map(|d| d.join("spendwatch"))
    }

    /// Resolve the thresholds.json path.
    pub fn resolve_thresholds_path(&self) -> (Option<PathBuf>, ConfigResolution) {
        // 1. CLI flag
        if let Some(ref path) = self.cli_paths.thresholds_path {
            return (Some(path.clone()), ConfigResolution::CliFlag);
        }

        // 2. SPENDWATCH_THRESHOLDS env var
        if let Ok(path) = env::var("SPENDWATCH_THRESHOLDS") {
            return (Some(PathBuf::from(path)), ConfigResolution::EnvVar);
        }

        // 3. XDG config dir
        if let Some(config_dir) = self.resolve_config_dir() {
            let path = config_dir.join("thresholds.json");
            if path.exists() {
                return (Some(path), ConfigResolution::XdgConfig);
            }
        }

        // 4. Default
        (None, ConfigResolution::Default)
    }

    /// Resolve the policy.json path.
    pub fn resolve_policy_path(&self) -> (Option<PathBuf>, ConfigResolution) {
        // 1. CLI flag
        if let Some(ref path) = self.cli_paths.policy_path {
            return (Some(path.clone()), ConfigResolution::CliFlag);
        }

        // 2. SPENDWATCH_POLICY env var
        if let Ok(path) = env::var("SPENDWATCH_POLICY") {
            return (Some(PathBuf::from(path)), ConfigResolution::EnvVar);
        }

        // 3. XDG config dir
        if let Some(config_dir) = self.resolve_config_dir() {
            let path = config_dir.join("policy.json");
            if path.exists() {
                return (Some(path), ConfigResolution::XdgConfig);
            }
        }

        // 4. Default
        (None, ConfigResolution::Default)
    }

    /// Load thresholds from resolved path or defaults.
    pub fn load_thresholds(&self) -> Result<(ThresholdSet, ConfigSource)> {
        let (path, resolution) = self.resolve_thresholds_path();

        match path {
            Some(p) => {
                let content = fs::read_to_string(&p).map_err(|e| {
                    Error::Config(format!(
                        "failed to read thresholds from {}: {}",
                        p.display(),
                        e
                    ))
                })?;

                let hash = compute_sha256(&content);

                let thresholds: ThresholdSet = serde_json::from_str(&content).map_err(|e| {
                    Error::InvalidThresholds(format!("failed to parse {}: {}", p.display(), e))
                })?;

                thresholds
                    .validate()
                    .map_err(|e| Error::InvalidThresholds(e.to_string()))?;

                Ok((
                    thresholds,
                    ConfigSource {
                        path: Some(p.to_string_lossy().to_string()),
                        hash: Some(hash),
                        resolution,
                    },
                ))
            }
            None => {
                let thresholds = ThresholdSet::default();
                Ok((
                    thresholds,
                    ConfigSource {
                        path: None,
                        hash: None,
                        resolution: ConfigResolution::Default,
                    },
                ))
            }
        }
    }

    /// Load detection policy from resolved path or defaults.
    pub fn load_policy(&self) -> Result<(DetectionPolicy, ConfigSource)> {
        let (path, resolution) = self.resolve_policy_path();

        match path {
            Some(p) => {
                let content = fs::read_to_string(&p).map_err(|e| {
                    Error::Config(format!("failed to read policy from {}: {}", p.display(), e))
                })?;

                let hash = compute_sha256(&content);

                let policy: DetectionPolicy = serde_json::from_str(&content).map_err(|e| {
                    Error::InvalidPolicy(format!("failed to parse {}: {}", p.display(), e))
                })?;

                policy
                    .validate()
                    .map_err(|e| Error::InvalidPolicy(e.to_string()))?;

                Ok((
                    policy,
                    ConfigSource {
                        path: Some(p.to_string_lossy().to_string()),
                        hash: Some(hash),
                        resolution,
                    },
                ))
            }
            None => {
                let policy = DetectionPolicy::default();
                Ok((
                    policy,
                    ConfigSource {
                        path: None,
                        hash: None,
                        resolution: ConfigResolution::Default,
                    },
                ))
            }
        }
    }
}

/// Compute SHA-256 hash of a string.
fn compute_sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}
