//! Age-based retention for rotated ledger files.
//!
//! Pruning works at whole-file granularity: rotated files whose
//! rotation timestamp falls before the retention horizon are deleted,
//! the active file is never touched. The rotation timestamp comes from
//! the filename, so pruning is deterministic regardless of filesystem
//! mtime behavior.

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{HistoryError, HISTORY_FILE_STEM, HISTORY_FILENAME};

/// Outcome of a prune pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PruneReport {
    /// Retention horizon applied; files rotated before this were removed.
    pub cutoff: DateTime<Utc>,

    /// Rotated files deleted.
    pub files_removed: usize,

    /// Records contained in the deleted files.
    pub entries_removed: u64,

    /// Bytes reclaimed.
    pub bytes_reclaimed: u64,
}

/// Delete rotated ledger files older than `retention_days`.
///
/// Files that do not match the `anomalies.<timestamp>.jsonl` pattern
/// are left alone, as is the active `anomalies.jsonl`.
pub fn prune_history(
    data_dir: &Path,
    retention_days: u32,
    now: DateTime<Utc>,
) -> Result<PruneReport, HistoryError> {
    let cutoff = now - Duration::days(i64::from(retention_days));
    let mut report = PruneReport {
        cutoff,
        files_removed: 0,
        entries_removed: 0,
        bytes_reclaimed: 0,
    };

    if !data_dir.exists() {
        return Ok(report);
    }

    let entries = std::fs::read_dir(data_dir).map_err(|e| HistoryError::Io {
        path: data_dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| HistoryError::Io {
            path: data_dir.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name().to_string_lossy().to_string();

        let Some(rotated_at) = parse_rotation_timestamp(&name) else {
            continue;
        };
        if rotated_at >= cutoff {
            continue;
        }

        let path = entry.path();
        let (entry_count, byte_count) = file_stats(&path)?;

        std::fs::remove_file(&path).map_err(|e| HistoryError::Io {
            path: path.clone(),
            source: e,
        })?;
        info!(
            file = %path.display(),
            entries = entry_count,
            "pruned rotated ledger file"
        );

        report.files_removed += 1;
        report.entries_removed += entry_count;
        report.bytes_reclaimed += byte_count;
    }

    Ok(report)
}

/// Extract the rotation timestamp from `anomalies.<ts>.jsonl`.
///
/// Returns `None` for the active file and anything else that does not
/// match the rotated-name pattern.
fn parse_rotation_timestamp(name: &str) -> Option<DateTime<Utc>> {
    if name == HISTORY_FILENAME {
        return None;
    }
    let ts = name
        .strip_prefix(HISTORY_FILE_STEM)?
        .strip_prefix('.')?
        .strip_suffix(".jsonl")?;
    NaiveDateTime::parse_from_str(ts, "%Y%m%d-%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn file_stats(path: &Path) -> Result<(u64, u64), HistoryError> {
    let content = std::fs::read_to_string(path).map_err(|e| HistoryError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let entries = content.lines().filter(|l| !l.trim().is_empty()).count() as u64;
    Ok((entries, content.len() as u64))
}
