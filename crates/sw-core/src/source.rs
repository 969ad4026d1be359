//! Data source and anomaly sink abstractions.
//!
//! The pipeline fetches observations through [`SpendDataSource`] and
//! persists anomalies through [`AnomalySink`], so the same detection
//! code runs against in-memory fixtures, JSON files, and the real
//! ledger. Fetches fail per campaign; one broken campaign never takes
//! down the whole run.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sw_common::CampaignId;

use crate::history::{AnomalyRecord, HistoryLedger};
use crate::model::{
    DailyAnalytics, ForecastObservation, ObservationRecord, PerformanceObservation,
};

// ============================================================================
// Time window
// ============================================================================

/// Half-open-ended observation window. Unset bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TimeWindow {
    /// Keep observations at or after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,

    /// Keep observations at or before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// The unbounded window.
    pub fn all() -> TimeWindow {
        TimeWindow::default()
    }

    /// A window bounded on both sides.
    pub fn between(since: DateTime<Utc>, until: DateTime<Utc>) -> TimeWindow {
        TimeWindow {
            since: Some(since),
            until: Some(until),
        }
    }

    /// Whether a timestamp falls inside the window (bounds inclusive).
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if ts < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if ts > until {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by data source implementations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("campaign not found: {campaign_id}")]
    NotFound { campaign_id: String },

    #[error("fetch failed for campaign {campaign_id}: {message}")]
    Fetch {
        campaign_id: String,
        message: String,
    },

    #[error("failed to decode observations from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<SourceError> for sw_common::Error {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound { campaign_id } => {
                sw_common::Error::CampaignNotFound { campaign_id }
            }
            SourceError::Decode { .. } => sw_common::Error::SourceDecode(err.to_string()),
            other => sw_common::Error::Source(other.to_string()),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Read side of the data-store collaboration.
pub trait SpendDataSource {
    /// Fetch actual-spend rows for one campaign within a window.
    fn fetch_performance(
        &self,
        campaign_id: &CampaignId,
        window: &TimeWindow,
    ) -> Result<Vec<PerformanceObservation>, SourceError>;

    /// Fetch forecast rows for one campaign within a window.
    fn fetch_forecasts(
        &self,
        campaign_id: &CampaignId,
        window: &TimeWindow,
    ) -> Result<Vec<ForecastObservation>, SourceError>;

    /// Display label for a campaign. `None` when the source carries no
    /// labels; callers fall back to the raw id.
    fn campaign_name(&self, campaign_id: &CampaignId) -> Option<String>;

    /// All campaign ids with performance data, in a stable order.
    fn campaign_ids(&self) -> Vec<CampaignId>;
}

/// Write side: where classified anomalies go.
pub trait AnomalySink {
    /// Persist one anomaly record.
    fn record(&mut self, record: &AnomalyRecord) -> sw_common::Result<()>;
}

impl AnomalySink for HistoryLedger {
    fn record(&mut self, record: &AnomalyRecord) -> sw_common::Result<()> {
        self.append(record).map_err(Into::into)
    }
}

/// Sink that retains records in memory. Test double.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<AnomalyRecord>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        MemorySink::default()
    }

    /// Records captured so far.
    pub fn recorded(&self) -> &[AnomalyRecord] {
        &self.records
    }
}

impl AnomalySink for MemorySink {
    fn record(&mut self, record: &AnomalyRecord) -> sw_common::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

// ============================================================================
// Memory source
// ============================================================================

/// In-memory data source for tests and the demo pipeline.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    performance: Vec<PerformanceObservation>,
    forecasts: Vec<ForecastObservation>,
    names: HashMap<CampaignId, String>,
    failing: HashSet<CampaignId>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    /// Add performance rows.
    pub fn with_performance(mut self, rows: Vec<PerformanceObservation>) -> Self {
        self.performance.extend(rows);
        self
    }

    /// Add forecast rows.
    pub fn with_forecasts(mut self, rows: Vec<ForecastObservation>) -> Self {
        self.forecasts.extend(rows);
        self
    }

    /// Attach a display label to a campaign.
    pub fn with_campaign_name(
        mut self,
        campaign_id: impl Into<CampaignId>,
        name: impl Into<String>,
    ) -> Self {
        self.names.insert(campaign_id.into(), name.into());
        self
    }

    /// Make fetches for a campaign fail. Lets tests exercise the
    /// partial-failure path without a real backend.
    pub fn with_fetch_failure(mut self, campaign_id: impl Into<CampaignId>) -> Self {
        self.failing.insert(campaign_id.into());
        self
    }

    fn check_available(&self, campaign_id: &CampaignId) -> Result<(), SourceError> {
        if self.failing.contains(campaign_id) {
            return Err(SourceError::Fetch {
                campaign_id: campaign_id.as_str().to_string(),
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl SpendDataSource for MemorySource {
    fn fetch_performance(
        &self,
        campaign_id: &CampaignId,
        window: &TimeWindow,
    ) -> Result<Vec<PerformanceObservation>, SourceError> {
        self.check_available(campaign_id)?;
        Ok(self
            .performance
            .iter()
            .filter(|p| &p.campaign_id == campaign_id && window.contains(p.timestamp))
            .cloned()
            .collect())
    }

    fn fetch_forecasts(
        &self,
        campaign_id: &CampaignId,
        window: &TimeWindow,
    ) -> Result<Vec<ForecastObservation>, SourceError> {
        self.check_available(campaign_id)?;
        Ok(self
            .forecasts
            .iter()
            .filter(|f| &f.campaign_id == campaign_id && window.contains(f.timestamp))
            .cloned()
            .collect())
    }

    fn campaign_name(&self, campaign_id: &CampaignId) -> Option<String> {
        self.names.get(campaign_id).cloned()
    }

    fn campaign_ids(&self) -> Vec<CampaignId> {
        let ids: BTreeSet<CampaignId> = self
            .performance
            .iter()
            .map(|p| p.campaign_id.clone())
            .collect();
        ids.into_iter().collect()
    }
}

// ============================================================================
// File source
// ============================================================================

/// Data source backed by JSON observation files.
///
/// Each input file is a JSON array of tagged [`ObservationRecord`]s.
/// Files load eagerly; daily rollups ride along for reporting but do
/// not feed classification. File input carries no display labels, so
/// campaign names always fall back to the raw id.
#[derive(Debug, Default)]
pub struct FileSource {
    performance: Vec<PerformanceObservation>,
    forecasts: Vec<ForecastObservation>,
    daily: Vec<DailyAnalytics>,
}

impl FileSource {
    /// Load observation records from one or more JSON files.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<FileSource, SourceError> {
        let mut source = FileSource::default();
        for path in paths {
            source.load_file(path.as_ref())?;
        }
        Ok(source)
    }

    fn load_file(&mut self, path: &Path) -> Result<(), SourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let records: Vec<ObservationRecord> =
            serde_json::from_str(&content).map_err(|e| SourceError::Decode {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        for record in records {
            match record {
                ObservationRecord::Performance(p) => self.performance.push(p),
                ObservationRecord::Forecast(f) => self.forecasts.push(f),
                ObservationRecord::Daily(d) => self.daily.push(d),
            }
        }
        Ok(())
    }

    /// Daily rollups carried by the input files.
    pub fn daily(&self) -> &[DailyAnalytics] {
        &self.daily
    }

    /// Total observation rows loaded (excluding daily rollups).
    pub fn observation_count(&self) -> usize {
        self.performance.len() + self.forecasts.len()
    }
}

impl SpendDataSource for FileSource {
    fn fetch_performance(
        &self,
        campaign_id: &CampaignId,
        window: &TimeWindow,
    ) -> Result<Vec<PerformanceObservation>, SourceError> {
        Ok(self
            .performance
            .iter()
            .filter(|p| &p.campaign_id == campaign_id && window.contains(p.timestamp))
            .cloned()
            .collect())
    }

    fn fetch_forecasts(
        &self,
        campaign_id: &CampaignId,
        window: &TimeWindow,
    ) -> Result<Vec<ForecastObservation>, SourceError> {
        Ok(self
            .forecasts
            .iter()
            .filter(|f| &f.campaign_id == campaign_id && window.contains(f.timestamp))
            .cloned()
            .collect())
    }

    fn campaign_name(&self, _campaign_id: &CampaignId) -> Option<String> {
        None
    }

    fn campaign_ids(&self) -> Vec<CampaignId> {
        let ids: BTreeSet<CampaignId> = self
            .performance
            .iter()
            .map(|p| p.campaign_id.clone())
            .collect();
        ids.into_iter().collect()
    }
}
