//! History ledger reader with filtering.
//!
//! Reads are tolerant: a corrupt line is logged and skipped, never
//! fatal. A ledger that survived a crash mid-append still serves every
//! intact record.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::entry::AnomalyRecord;
use super::HistoryError;
use crate::model::Severity;

/// Record filter for ledger reads. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Exact severity match.
    pub severity: Option<Severity>,

    /// Campaign id or display label.
    pub campaign: Option<String>,

    /// Keep records recorded at or after this instant.
    pub since: Option<DateTime<Utc>>,

    /// Keep records recorded at or before this instant.
    pub until: Option<DateTime<Utc>>,

    /// Keep only the newest N matching records.
    pub limit: Option<usize>,
}

impl HistoryFilter {
    /// Whether a record passes the filter (limit is applied separately).
    pub fn matches(&self, record: &AnomalyRecord) -> bool {
        if let Some(severity) = self.severity {
            if record.severity != severity {
                return false;
            }
        }
        if let Some(ref campaign) = self.campaign {
            if !record.matches_campaign(campaign) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.recorded_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.recorded_at > until {
                return false;
            }
        }
        true
    }
}

/// Accounting for one ledger read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadReport {
    /// Non-empty lines scanned.
    pub scanned: usize,
    /// Records that passed the filter.
    pub matched: usize,
    /// Corrupt lines skipped.
    pub skipped_corrupt: usize,
}

/// Read matching records from a ledger file.
///
/// Records come back in append order; with a limit set, the newest N
/// are kept (still in append order). A missing file reads as empty.
pub fn read_history(
    path: &Path,
    filter: &HistoryFilter,
) -> Result<Vec<AnomalyRecord>, HistoryError> {
    read_history_with_report(path, filter).map(|(records, _)| records)
}

/// [`read_history`] variant that also reports scan accounting.
pub fn read_history_with_report(
    path: &Path,
    filter: &HistoryFilter,
) -> Result<(Vec<AnomalyRecord>, ReadReport), HistoryError> {
    let mut records = Vec::new();
    let mut report = ReadReport::default();

    if !path.exists() {
        return Ok((records, report));
    }

    let file = File::open(path).map_err(|e| HistoryError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| HistoryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        report.scanned += 1;

        let record: AnomalyRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                report.skipped_corrupt += 1;
                warn!(
                    path = %path.display(),
                    line = line_num + 1,
                    error = %e,
                    "skipping corrupt history record"
                );
                continue;
            }
        };

        if filter.matches(&record) {
            records.push(record);
        }
    }

    report.matched = records.len();

    if let Some(limit) = filter.limit {
        if records.len() > limit {
            records.drain(..records.len() - limit);
        }
    }

    Ok((records, report))
}
