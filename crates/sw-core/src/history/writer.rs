//! History ledger writer with size-based rotation.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::entry::AnomalyRecord;
use super::{resolve_data_dir, HistoryError, HISTORY_FILENAME, HISTORY_FILE_STEM};

/// Configuration for the ledger writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Maximum active file size in bytes before rotation (default: 50MB).
    pub max_size_bytes: u64,
    /// Enable automatic rotation on append.
    pub auto_rotate: bool,
    /// Data directory override. `None` resolves the standard location.
    pub data_dir: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            max_size_bytes: 50 * 1024 * 1024, // 50MB
            auto_rotate: true,
            data_dir: None,
        }
    }
}

/// The anomaly history ledger writer.
///
/// Appends records to the active JSONL file and rotates it when it
/// grows past the configured size. Existing entries are never touched.
pub struct HistoryLedger {
    /// Path to the active ledger file.
    path: PathBuf,
    /// Configuration.
    config: LedgerConfig,
    /// Number of entries in the active file.
    entry_count: u64,
    /// Buffered writer, opened lazily on first append.
    writer: Option<BufWriter<File>>,
}

impl HistoryLedger {
    /// Open the ledger at the standard location, creating it if needed.
    pub fn open_or_create() -> Result<Self, HistoryError> {
        Self::open_or_create_with_config(LedgerConfig::default())
    }

    /// Open or create with custom configuration.
    pub fn open_or_create_with_config(mut config: LedgerConfig) -> Result<Self, HistoryError> {
        let data_dir = config
            .data_dir
            .take()
            .map(Ok)
            .unwrap_or_else(resolve_data_dir)?;

        std::fs::create_dir_all(&data_dir).map_err(|e| HistoryError::Io {
            path: data_dir.clone(),
            source: e,
        })?;

        let path = data_dir.join(HISTORY_FILENAME);
        let entry_count = if path.exists() {
            Self::count_entries(&path)?
        } else {
            0
        };

        config.data_dir = Some(data_dir);

        Ok(HistoryLedger {
            path,
            config,
            entry_count,
            writer: None,
        })
    }

    /// Path to the active ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries in the active file.
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Append one anomaly record.
    pub fn append(&mut self, record: &AnomalyRecord) -> Result<(), HistoryError> {
        if self.config.auto_rotate && self.should_rotate()? {
            self.rotate()?;
        }

        let line = record.to_jsonl()?;

        self.ensure_writer_open()?;
        if let Some(ref mut writer) = self.writer {
            writeln!(writer, "{}", line).map_err(|e| HistoryError::Io {
                path: self.path.clone(),
                source: e,
            })?;
            writer.flush().map_err(|e| HistoryError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        }

        self.entry_count += 1;
        Ok(())
    }

    /// Rotate the active file.
    ///
    /// Renames it to `anomalies.YYYYMMDD-HHMMSS.jsonl` and starts a
    /// fresh active file on the next append.
    pub fn rotate(&mut self) -> Result<PathBuf, HistoryError> {
        self.writer = None;

        let timestamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        let rotated_name = format!("{}.{}.jsonl", HISTORY_FILE_STEM, timestamp);
        let data_dir = self
            .config
            .data_dir
            .as_ref()
            .ok_or(HistoryError::DataDirUnavailable)?;
        let rotated_path = data_dir.join(&rotated_name);

        std::fs::rename(&self.path, &rotated_path).map_err(|e| HistoryError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        self.entry_count = 0;
        Ok(rotated_path)
    }

    /// Check if rotation is needed based on file size.
    fn should_rotate(&self) -> Result<bool, HistoryError> {
        if !self.path.exists() {
            return Ok(false);
        }

        let metadata = std::fs::metadata(&self.path).map_err(|e| HistoryError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(metadata.len() >= self.config.max_size_bytes)
    }

    /// Ensure the writer is open.
    fn ensure_writer_open(&mut self) -> Result<(), HistoryError> {
        if self.writer.is_some() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HistoryError::Io {
                path: self.path.clone(),
                source: e,
            })?;

        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    /// Count non-empty lines in an existing ledger file.
    fn count_entries(path: &Path) -> Result<u64, HistoryError> {
        let file = File::open(path).map_err(|e| HistoryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let reader = BufReader::new(file);
        let mut count = 0u64;
        for line in reader.lines() {
            let line = line.map_err(|e| HistoryError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Flush any buffered writes.
    pub fn flush(&mut self) -> Result<(), HistoryError> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| HistoryError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Close the writer (also called on drop).
    pub fn close(&mut self) {
        if let Some(ref mut writer) = self.writer {
            let _ = writer.flush();
        }
        self.writer = None;
    }
}

impl Drop for HistoryLedger {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::model::ClassifiedDeviation;
    use chrono::TimeZone;
    use sw_common::RunId;
    use sw_config::ThresholdSet;
    use tempfile::TempDir;

    fn test_config(dir: &Path) -> LedgerConfig {
        LedgerConfig {
            max_size_bytes: 1024 * 1024,
            auto_rotate: false,
            data_dir: Some(dir.to_path_buf()),
        }
    }

    fn anomaly(actual: f64) -> ClassifiedDeviation {
        let ts = Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap();
        classify("camp-001", ts, actual, 100.0, &ThresholdSet::default())
    }

    fn record(actual: f64) -> AnomalyRecord {
        AnomalyRecord::from_deviation(&anomaly(actual), "camp-001", &RunId::new())
    }

    #[test]
    fn test_ledger_creation() {
        let tmp = TempDir::new().unwrap();
        let ledger = HistoryLedger::open_or_create_with_config(test_config(tmp.path())).unwrap();

        assert_eq!(ledger.entry_count(), 0);
        assert_eq!(ledger.path(), tmp.path().join("anomalies.jsonl"));
    }

    #[test]
    fn test_ledger_append() {
        let tmp = TempDir::new().unwrap();
        let mut ledger =
            HistoryLedger::open_or_create_with_config(test_config(tmp.path())).unwrap();

        ledger.append(&record(200.0)).unwrap();
        ledger.append(&record(145.0)).unwrap();
        assert_eq!(ledger.entry_count(), 2);

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""severity":"high""#));
        assert!(lines[1].contains(r#""severity":"medium""#));
    }

    #[test]
    fn test_ledger_reopen_counts_entries() {
        let tmp = TempDir::new().unwrap();
        {
            let mut ledger =
                HistoryLedger::open_or_create_with_config(test_config(tmp.path())).unwrap();
            ledger.append(&record(200.0)).unwrap();
            ledger.append(&record(200.0)).unwrap();
            ledger.append(&record(200.0)).unwrap();
        }
        {
            let ledger =
                HistoryLedger::open_or_create_with_config(test_config(tmp.path())).unwrap();
            assert_eq!(ledger.entry_count(), 3);
        }
    }

    #[test]
    fn test_ledger_rotation() {
        let tmp = TempDir::new().unwrap();
        let mut ledger =
            HistoryLedger::open_or_create_with_config(test_config(tmp.path())).unwrap();

        ledger.append(&record(200.0)).unwrap();
        let rotated = ledger.rotate().unwrap();

        assert!(rotated.exists());
        let name = rotated.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("anomalies."));
        assert!(name.ends_with(".jsonl"));
        assert_ne!(name, "anomalies.jsonl");
        assert_eq!(ledger.entry_count(), 0);

        // Appending after rotation starts a fresh active file.
        ledger.append(&record(145.0)).unwrap();
        assert!(ledger.path().exists());
        assert_eq!(ledger.entry_count(), 1);
    }

    #[test]
    fn test_ledger_auto_rotation_on_size() {
        let tmp = TempDir::new().unwrap();
        let config = LedgerConfig {
            max_size_bytes: 64, // One record is bigger than this.
            auto_rotate: true,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let mut ledger = HistoryLedger::open_or_create_with_config(config).unwrap();

        ledger.append(&record(200.0)).unwrap();
        ledger.append(&record(200.0)).unwrap();

        // The first append filled the active file past the limit, so
        // the second rotated it out first.
        let rotated: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n != "anomalies.jsonl")
            .collect();
        assert_eq!(rotated.len(), 1);
        assert_eq!(ledger.entry_count(), 1);
    }

    #[test]
    fn test_ledger_ignores_blank_lines_on_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("anomalies.jsonl");
        let line = record(200.0).to_jsonl().unwrap();
        std::fs::write(&path, format!("{}\n\n{}\n", line, line)).unwrap();

        let ledger =
            HistoryLedger::open_or_create_with_config(test_config(tmp.path())).unwrap();
        assert_eq!(ledger.entry_count(), 2);
    }
}
