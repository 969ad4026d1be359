//! Append-only anomaly history ledger.
//!
//! Classified anomalies persist as independent historical records,
//! decoupled from the observations that produced them. The ledger is
//! JSON Lines, one record per line, append-only: records are never
//! updated in place, and retention works at whole-file granularity.
//!
//! # Design
//!
//! - **Format**: JSONL, one [`AnomalyRecord`] per line
//! - **Rotation**: the active file rotates at a size threshold to
//!   `anomalies.YYYYMMDD-HHMMSS.jsonl`
//! - **Retention**: rotated files older than the configured horizon are
//!   deleted whole; the active file is never rewritten
//! - **Reads**: corrupt lines are skipped with a warning, never fatal
//!
//! # File Location
//!
//! The ledger lives at:
//! - `$SPENDWATCH_DATA/anomalies.jsonl` (if SPENDWATCH_DATA is set)
//! - `$XDG_DATA_HOME/spendwatch/anomalies.jsonl` (otherwise)
//! - platform data dir + `spendwatch/` as the last resort

mod entry;
mod reader;
mod retention;
mod writer;

pub use entry::AnomalyRecord;
pub use reader::{read_history, read_history_with_report, HistoryFilter, ReadReport};
pub use retention::{prune_history, PruneReport};
pub use writer::{HistoryLedger, LedgerConfig};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during history ledger operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to resolve history data directory (set SPENDWATCH_DATA or XDG_DATA_HOME)")]
    DataDirUnavailable,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize anomaly record: {source}")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse anomaly record at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl From<HistoryError> for sw_common::Error {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::Parse { line, .. } => sw_common::Error::HistoryCorrupted {
                path: HISTORY_FILENAME.to_string(),
                line,
            },
            other => sw_common::Error::History(other.to_string()),
        }
    }
}

/// Active ledger filename within the data directory.
pub(crate) const HISTORY_FILENAME: &str = "anomalies.jsonl";

/// Prefix shared by the active file and its rotations.
pub(crate) const HISTORY_FILE_STEM: &str = "anomalies";

/// Resolve the history data directory using standard XDG paths.
pub fn resolve_data_dir() -> Result<PathBuf, HistoryError> {
    // 1. Explicit override: SPENDWATCH_DATA
    if let Ok(dir) = std::env::var("SPENDWATCH_DATA") {
        return Ok(PathBuf::from(dir));
    }

    // 2. XDG_DATA_HOME
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join("spendwatch"));
    }

    // 3. Platform default (dirs crate)
    if let Some(base) = dirs::data_dir() {
        return Ok(base.join("spendwatch"));
    }

    Err(HistoryError::DataDirUnavailable)
}
