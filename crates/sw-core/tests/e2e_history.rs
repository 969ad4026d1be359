//! CLI E2E tests for the `history` command.
//!
//! Seeds the ledger through `demo --record` (9 anomalies: one low, one
//! medium, one high per demo campaign), then exercises:
//! - `history list` with severity, campaign, window, and limit filters
//! - Record shape of the JSON output
//! - `history prune` against rotated ledger files

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

// ============================================================================
// Helpers
// ============================================================================

/// Get a Command for sw-core with config isolated from the developer's
/// real environment.
fn sw_core() -> Command {
    let mut cmd = cargo_bin_cmd!("sw-core");
    cmd.timeout(Duration::from_secs(60));
    cmd.env("SPENDWATCH_CONFIG", "/nonexistent/spendwatch-test-config");
    cmd.env_remove("SPENDWATCH_THRESHOLDS");
    cmd.env_remove("SPENDWATCH_POLICY");
    cmd.env_remove("SPENDWATCH_DATA");
    cmd
}

/// Run a demo with `--record` into a fresh data dir, leaving 9 anomaly
/// records (3 low, 3 medium, 3 high across three campaigns).
fn seeded_data_dir() -> TempDir {
    let data_dir = tempdir().expect("create data dir");
    sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["--format", "json", "demo", "--record"])
        .assert()
        .code(1);
    data_dir
}

fn list_json(data_dir: &Path, extra_args: &[&str], expect_code: i32) -> Value {
    let output = sw_core()
        .env("SPENDWATCH_DATA", data_dir)
        .args(["--format", "json", "history", "list"])
        .args(extra_args)
        .assert()
        .code(expect_code)
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("parse JSON")
}

// ============================================================================
// history list
// ============================================================================

#[test]
fn test_history_list_empty_ledger() {
    let data_dir = tempdir().expect("create data dir");
    let records = list_json(data_dir.path(), &[], 0);
    assert_eq!(records.as_array().expect("array").len(), 0);
}

#[test]
fn test_history_list_after_recorded_run() {
    let data_dir = seeded_data_dir();
    let records = list_json(data_dir.path(), &[], 0);
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 9, "demo --record leaves 9 records");

    for record in records {
        assert!(record["record_id"].is_string(), "record_id: {}", record);
        assert!(record["run_id"].is_string(), "run_id: {}", record);
        assert!(record["campaign"].is_string(), "campaign: {}", record);
        assert!(record["campaign_id"].is_string(), "campaign_id: {}", record);
        assert!(record["value"].is_number(), "value: {}", record);
        assert!(record["expected"].is_number(), "expected: {}", record);
        assert!(record["percentage"].is_number(), "percentage: {}", record);
        assert!(record["severity"].is_string(), "severity: {}", record);
    }

    // One run wrote all of them.
    let run_ids: Vec<&Value> = records.iter().map(|r| &r["run_id"]).collect();
    assert!(run_ids.iter().all(|id| *id == run_ids[0]));
}

#[test]
fn test_history_severity_filter() {
    let data_dir = seeded_data_dir();

    let high = list_json(data_dir.path(), &["--severity", "high"], 0);
    let high = high.as_array().expect("array");
    assert_eq!(high.len(), 3);
    assert!(high.iter().all(|r| r["severity"] == "high"));

    let low = list_json(data_dir.path(), &["--severity", "low"], 0);
    assert_eq!(low.as_array().expect("array").len(), 3);
}

#[test]
fn test_history_severity_filter_accepts_tier_alias() {
    let data_dir = seeded_data_dir();
    let records = list_json(data_dir.path(), &["--severity", "l3"], 0);
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r["severity"] == "high"));
}

#[test]
fn test_history_campaign_filter_by_label() {
    let data_dir = seeded_data_dir();
    let records = list_json(data_dir.path(), &["--campaign", "Spring Sale"], 0);
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r["campaign"] == "Spring Sale"));
}

#[test]
fn test_history_campaign_filter_by_id() {
    let data_dir = seeded_data_dir();
    let records = list_json(data_dir.path(), &["--campaign", "camp-001"], 0);
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r["campaign_id"] == "camp-001"));
}

#[test]
fn test_history_campaign_and_severity_combine() {
    let data_dir = seeded_data_dir();
    let records = list_json(
        data_dir.path(),
        &["--campaign", "camp-001", "--severity", "high"],
        0,
    );
    assert_eq!(records.as_array().expect("array").len(), 1);
}

#[test]
fn test_history_limit_keeps_newest() {
    let data_dir = seeded_data_dir();

    let all = list_json(data_dir.path(), &[], 0);
    let all = all.as_array().expect("array");
    let limited = list_json(data_dir.path(), &["--limit", "4"], 0);
    let limited = limited.as_array().expect("array");

    assert_eq!(limited.len(), 4);
    // The newest 4 are the tail of the full listing.
    assert_eq!(&all[all.len() - 4..], limited.as_slice());
}

#[test]
fn test_history_window_filters_on_recorded_at() {
    let data_dir = seeded_data_dir();

    let all = list_json(data_dir.path(), &["--since", "2000-01-01T00:00:00Z"], 0);
    assert_eq!(all.as_array().expect("array").len(), 9);

    let none = list_json(data_dir.path(), &["--until", "2000-01-01T00:00:00Z"], 0);
    assert_eq!(none.as_array().expect("array").len(), 0);
}

#[test]
fn test_history_unknown_severity_is_args_error() {
    let data_dir = tempdir().expect("create data dir");
    sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["history", "list", "--severity", "apocalyptic"])
        .assert()
        .code(10)
        .stderr(predicates::str::contains("unknown severity"));
}

#[test]
fn test_history_invalid_since_is_args_error() {
    let data_dir = tempdir().expect("create data dir");
    sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["history", "list", "--since", "not-a-timestamp"])
        .assert()
        .code(10);
}

#[test]
fn test_history_list_markdown() {
    let data_dir = seeded_data_dir();
    let output = sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["--format", "md", "history", "list"])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.contains("# Anomaly History"));
    assert!(text.contains("| Spring Sale |"));
}

#[test]
fn test_history_list_markdown_empty() {
    let data_dir = tempdir().expect("create data dir");
    let output = sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["--format", "md", "history", "list"])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.contains("No records."));
}

#[test]
fn test_history_list_summary_and_metrics() {
    let data_dir = seeded_data_dir();

    sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["--format", "summary", "history", "list"])
        .assert()
        .code(0)
        .stdout(predicates::str::contains("9 anomaly records"));

    sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["--format", "metrics", "history", "list"])
        .assert()
        .code(0)
        .stdout(predicates::str::contains("spendwatch_history_records=9"));
}

// ============================================================================
// history prune
// ============================================================================

#[test]
fn test_history_prune_empty_data_dir() {
    let data_dir = tempdir().expect("create data dir");
    let output = sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["--format", "json", "history", "prune"])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).expect("parse JSON");
    assert_eq!(report["files_removed"], 0);
    assert_eq!(report["entries_removed"], 0);
}

#[test]
fn test_history_prune_removes_expired_rotations() {
    let data_dir = tempdir().expect("create data dir");
    // Rotated well before any reasonable horizon; 2 records inside.
    std::fs::write(
        data_dir.path().join("anomalies.20200101-000000.jsonl"),
        "{\"fake\":1}\n{\"fake\":2}\n",
    )
    .expect("write rotated file");
    std::fs::write(data_dir.path().join("anomalies.jsonl"), "{\"fake\":3}\n")
        .expect("write active file");

    let output = sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["--format", "json", "history", "prune"])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).expect("parse JSON");
    assert_eq!(report["files_removed"], 1);
    assert_eq!(report["entries_removed"], 2);

    assert!(!data_dir
        .path()
        .join("anomalies.20200101-000000.jsonl")
        .exists());
    // The active ledger is never pruned.
    assert!(data_dir.path().join("anomalies.jsonl").exists());
}

#[test]
fn test_history_prune_retention_override() {
    let data_dir = tempdir().expect("create data dir");
    // Rotated within the default 90 day horizon but outside 0 days.
    let recent = chrono::Utc::now() - chrono::Duration::days(5);
    let name = format!("anomalies.{}.jsonl", recent.format("%Y%m%d-%H%M%S"));
    std::fs::write(data_dir.path().join(&name), "{\"fake\":1}\n").expect("write rotated file");

    // Default retention keeps it.
    let output = sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["--format", "json", "history", "prune"])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).expect("parse JSON");
    assert_eq!(report["files_removed"], 0);
    assert!(data_dir.path().join(&name).exists());

    // --retention-days 0 expires everything rotated in the past.
    let output = sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args([
            "--format",
            "json",
            "history",
            "prune",
            "--retention-days",
            "0",
        ])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).expect("parse JSON");
    assert_eq!(report["files_removed"], 1);
    assert!(!data_dir.path().join(&name).exists());
}

#[test]
fn test_history_prune_summary_output() {
    let data_dir = tempdir().expect("create data dir");
    sw_core()
        .env("SPENDWATCH_DATA", data_dir.path())
        .args(["--format", "summary", "history", "prune"])
        .assert()
        .code(0)
        .stdout(predicates::str::contains("removed 0 rotated files"));
}
