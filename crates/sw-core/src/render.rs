//! Output rendering for the CLI.
//!
//! Every renderer takes a value and an [`OutputFormat`] and returns the
//! full output as a `String`; `main.rs` only prints. Formats:
//!
//! - `json`: pretty-printed serde output, the machine contract
//! - `md`: markdown headings and tables for humans and chat bots
//! - `summary`: one line, for shell prompts and cron mail subjects
//! - `metrics`: `key=value` lines for scrapers

use std::fmt::Write as _;

use sw_common::{OutputFormat, Result};
use sw_config::{Config, PresetInfo};

use crate::history::{AnomalyRecord, PruneReport};
use crate::model::ClassifiedDeviation;
use crate::pipeline::DetectionReport;

/// Render a detection run report.
pub fn render_report(report: &DetectionReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Summary => Ok(format!(
            "run {}: {} rows, {} anomalies ({} high, {} medium, {} low), {} campaigns failed",
            report.run_id.0,
            report.summary.total_rows,
            report.summary.total_anomalies,
            report.summary.high,
            report.summary.medium,
            report.summary.low,
            report.campaigns.failed.len(),
        )),
        OutputFormat::Metrics => Ok(report_metrics(report)),
        OutputFormat::Md => Ok(report_markdown(report)),
    }
}

fn report_metrics(report: &DetectionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "spendwatch_rows_total={}", report.summary.total_rows);
    let _ = writeln!(out, "spendwatch_rows_matched={}", report.join_report.matched);
    let _ = writeln!(
        out,
        "spendwatch_rows_zero_filled={}",
        report.join_report.zero_filled
    );
    let _ = writeln!(
        out,
        "spendwatch_rows_excluded={}",
        report.join_report.excluded
    );
    let _ = writeln!(
        out,
        "spendwatch_anomalies_total={}",
        report.summary.total_anomalies
    );
    let _ = writeln!(out, "spendwatch_anomalies_low={}", report.summary.low);
    let _ = writeln!(out, "spendwatch_anomalies_medium={}", report.summary.medium);
    let _ = writeln!(out, "spendwatch_anomalies_high={}", report.summary.high);
    let _ = writeln!(
        out,
        "spendwatch_deviation_magnitude={:.2}",
        report.summary.total_magnitude
    );
    let _ = writeln!(
        out,
        "spendwatch_campaigns_ok={}",
        report.campaigns.succeeded.len()
    );
    let _ = writeln!(
        out,
        "spendwatch_campaigns_failed={}",
        report.campaigns.failed.len()
    );
    let _ = writeln!(
        out,
        "spendwatch_anomalies_recorded={}",
        report.anomalies_recorded
    );
    out
}

fn report_markdown(report: &DetectionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Spend Deviation Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Run: `{}`", report.run_id.0);
    let _ = writeln!(out, "- Generated: {}", report.generated_at.to_rfc3339());
    let _ = writeln!(out, "- Window: {}", window_label(report));
    let _ = writeln!(
        out,
        "- Campaigns: {} ok, {} failed",
        report.campaigns.succeeded.len(),
        report.campaigns.failed.len()
    );
    let _ = writeln!(
        out,
        "- Rows: {} classified ({} matched, {} zero-filled, {} excluded)",
        report.summary.total_rows,
        report.join_report.matched,
        report.join_report.zero_filled,
        report.join_report.excluded
    );
    let _ = writeln!(
        out,
        "- Anomalies: {} ({} high, {} medium, {} low), total magnitude {:.2}",
        report.summary.total_anomalies,
        report.summary.high,
        report.summary.medium,
        report.summary.low,
        report.summary.total_magnitude
    );

    let anomalies: Vec<&ClassifiedDeviation> = report.anomalies().collect();
    if !anomalies.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Anomalies");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "| Campaign | Time | Actual | Forecast | Deviation | Severity |"
        );
        let _ = writeln!(out, "|---|---|---|---|---|---|");
        for d in anomalies {
            let _ = writeln!(
                out,
                "| {} | {} | {:.2} | {:.2} | {:+.2} ({:.1}%) | {} |",
                d.campaign_id,
                d.timestamp.to_rfc3339(),
                d.actual_spend,
                d.forecast_spend,
                d.difference,
                d.percentage_difference,
                d.severity
            );
        }
    }

    if !report.campaigns.failed.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Failed campaigns");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Campaign | Code | Error |");
        let _ = writeln!(out, "|---|---|---|");
        for f in &report.campaigns.failed {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                f.item_id, f.error.code, f.error.message
            );
        }
    }
    out
}

fn window_label(report: &DetectionReport) -> String {
    match (report.window.since, report.window.until) {
        (None, None) => "unbounded".to_string(),
        (Some(since), None) => format!("from {}", since.to_rfc3339()),
        (None, Some(until)) => format!("until {}", until.to_rfc3339()),
        (Some(since), Some(until)) => {
            format!("{} to {}", since.to_rfc3339(), until.to_rfc3339())
        }
    }
}

/// Render a single classified deviation (the `classify` subcommand).
pub fn render_deviation(deviation: &ClassifiedDeviation, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(deviation)?),
        OutputFormat::Summary => {
            let verdict = if deviation.is_anomaly {
                format!("anomaly ({})", deviation.severity)
            } else {
                "within thresholds".to_string()
            };
            Ok(format!(
                "{}: actual {:.2} vs forecast {:.2}, deviation {:.1}%, {}",
                deviation.campaign_id,
                deviation.actual_spend,
                deviation.forecast_spend,
                deviation.percentage_difference,
                verdict
            ))
        }
        OutputFormat::Metrics => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "spendwatch_percentage_difference={:.4}",
                deviation.percentage_difference
            );
            let _ = writeln!(out, "spendwatch_difference={:.4}", deviation.difference);
            let _ = writeln!(out, "spendwatch_tier={}", deviation.tier);
            let _ = writeln!(
                out,
                "spendwatch_is_anomaly={}",
                u8::from(deviation.is_anomaly)
            );
            Ok(out)
        }
        OutputFormat::Md => {
            let mut out = String::new();
            let _ = writeln!(out, "# Deviation");
            let _ = writeln!(out);
            let _ = writeln!(out, "- Campaign: {}", deviation.campaign_id);
            let _ = writeln!(out, "- Time: {}", deviation.timestamp.to_rfc3339());
            let _ = writeln!(out, "- Actual: {:.2}", deviation.actual_spend);
            let _ = writeln!(out, "- Forecast: {:.2}", deviation.forecast_spend);
            let _ = writeln!(
                out,
                "- Deviation: {:+.2} ({:.1}%)",
                deviation.difference, deviation.percentage_difference
            );
            let _ = writeln!(out, "- Tier: {}", deviation.tier);
            let _ = writeln!(
                out,
                "- Anomaly: {}",
                if deviation.is_anomaly { "yes" } else { "no" }
            );
            Ok(out)
        }
    }
}

/// Render ledger records (the `history list` subcommand).
pub fn render_history(records: &[AnomalyRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Summary => Ok(format!("{} anomaly records", records.len())),
        OutputFormat::Metrics => Ok(format!("spendwatch_history_records={}\n", records.len())),
        OutputFormat::Md => {
            let mut out = String::new();
            let _ = writeln!(out, "# Anomaly History");
            let _ = writeln!(out);
            if records.is_empty() {
                let _ = writeln!(out, "No records.");
                return Ok(out);
            }
            let _ = writeln!(out, "| Campaign | Time | Value | Expected | Severity |");
            let _ = writeln!(out, "|---|---|---|---|---|");
            for r in records {
                let _ = writeln!(
                    out,
                    "| {} | {} | {:.2} | {:.2} | {} |",
                    r.campaign, r.time, r.value, r.expected, r.severity
                );
            }
            Ok(out)
        }
    }
}

/// Render a retention prune outcome.
pub fn render_prune(report: &PruneReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Summary => Ok(format!(
            "removed {} rotated files ({} records, {} bytes)",
            report.files_removed, report.entries_removed, report.bytes_reclaimed
        )),
        OutputFormat::Metrics => {
            let mut out = String::new();
            let _ = writeln!(out, "spendwatch_prune_files_removed={}", report.files_removed);
            let _ = writeln!(
                out,
                "spendwatch_prune_entries_removed={}",
                report.entries_removed
            );
            let _ = writeln!(
                out,
                "spendwatch_prune_bytes_reclaimed={}",
                report.bytes_reclaimed
            );
            Ok(out)
        }
        OutputFormat::Md => {
            let mut out = String::new();
            let _ = writeln!(out, "# History Prune");
            let _ = writeln!(out);
            let _ = writeln!(out, "- Cutoff: {}", report.cutoff.to_rfc3339());
            let _ = writeln!(out, "- Files removed: {}", report.files_removed);
            let _ = writeln!(out, "- Records removed: {}", report.entries_removed);
            let _ = writeln!(out, "- Bytes reclaimed: {}", report.bytes_reclaimed);
            Ok(out)
        }
    }
}

/// Render the effective configuration (the `config show` subcommand).
pub fn render_config(config: &Config, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "thresholds": config.thresholds,
                "policy": config.policy,
                "snapshot": config.snapshot,
            });
            Ok(serde_json::to_string_pretty(&value)?)
        }
        OutputFormat::Summary => Ok(format!(
            "thresholds {}/{}/{} ({}), missing_forecast={}, invalid_spend={}, record={}, retention={}d",
            config.thresholds.l1,
            config.thresholds.l2,
            config.thresholds.l3,
            config.snapshot.thresholds_source.resolution,
            config.policy.missing_forecast,
            config.policy.invalid_spend,
            if config.policy.record_anomalies { "on" } else { "off" },
            config.policy.retention_days,
        )),
        OutputFormat::Metrics => {
            let mut out = String::new();
            let _ = writeln!(out, "spendwatch_threshold_l1={}", config.thresholds.l1);
            let _ = writeln!(out, "spendwatch_threshold_l2={}", config.thresholds.l2);
            let _ = writeln!(out, "spendwatch_threshold_l3={}", config.thresholds.l3);
            let _ = writeln!(
                out,
                "spendwatch_retention_days={}",
                config.policy.retention_days
            );
            let _ = writeln!(
                out,
                "spendwatch_record_anomalies={}",
                u8::from(config.policy.record_anomalies)
            );
            Ok(out)
        }
        OutputFormat::Md => {
            let mut out = String::new();
            let _ = writeln!(out, "# Effective Configuration");
            let _ = writeln!(out);
            let _ = writeln!(out, "## Thresholds");
            let _ = writeln!(out);
            let _ = writeln!(out, "- L1: {}%", config.thresholds.l1);
            let _ = writeln!(out, "- L2: {}%", config.thresholds.l2);
            let _ = writeln!(out, "- L3: {}%", config.thresholds.l3);
            let _ = writeln!(
                out,
                "- Source: {} {}",
                config.snapshot.thresholds_source.resolution,
                config
                    .snapshot
                    .thresholds_source
                    .path
                    .as_deref()
                    .unwrap_or("(built-in)")
            );
            let _ = writeln!(out);
            let _ = writeln!(out, "## Policy");
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "- Missing forecast: {}",
                config.policy.missing_forecast
            );
            let _ = writeln!(out, "- Invalid spend: {}", config.policy.invalid_spend);
            let _ = writeln!(
                out,
                "- Record anomalies: {}",
                config.policy.record_anomalies
            );
            let _ = writeln!(out, "- Retention: {} days", config.policy.retention_days);
            let _ = writeln!(
                out,
                "- Source: {} {}",
                config.snapshot.policy_source.resolution,
                config
                    .snapshot
                    .policy_source
                    .path
                    .as_deref()
                    .unwrap_or("(built-in)")
            );
            let _ = writeln!(out);
            let _ = writeln!(out, "- Config hash: `{}`", config.snapshot.combined_hash);
            Ok(out)
        }
    }
}

/// Render the preset catalog (the `config presets` subcommand).
pub fn render_presets(presets: &[PresetInfo], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(presets)?),
        OutputFormat::Summary => {
            let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
            Ok(format!("{} presets: {}", presets.len(), names.join(", ")))
        }
        OutputFormat::Metrics => Ok(format!("spendwatch_presets={}\n", presets.len())),
        OutputFormat::Md => {
            let mut out = String::new();
            let _ = writeln!(out, "# Presets");
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "| Name | L1 | L2 | L3 | Missing forecast | Invalid spend | Retention |"
            );
            let _ = writeln!(out, "|---|---|---|---|---|---|---|");
            for p in presets {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} | {}d |",
                    p.name, p.l1, p.l2, p.l3, p.missing_forecast, p.invalid_spend, p.retention_days
                );
            }
            let _ = writeln!(out);
            for p in presets {
                let _ = writeln!(out, "- **{}**: {}", p.name, p.description);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::model::{ForecastObservation, PerformanceObservation};
    use crate::pipeline::run_detection;
    use crate::source::{MemorySource, TimeWindow};
    use chrono::{TimeZone, Utc};
    use sw_config::{list_presets, ThresholdSet};

    fn ts() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap()
    }

    fn sample_report() -> DetectionReport {
        let source = MemorySource::new()
            .with_performance(vec![
                PerformanceObservation::new("camp-001", ts(), 250.0),
                PerformanceObservation::new("camp-001", ts() + chrono::Duration::hours(1), 100.0),
            ])
            .with_forecasts(vec![
                ForecastObservation::new("camp-001", ts(), 100.0),
                ForecastObservation::new("camp-001", ts() + chrono::Duration::hours(1), 100.0),
            ]);
        let config = Config::load_defaults().unwrap();
        run_detection(&source, &[], &TimeWindow::all(), &config, None).unwrap()
    }

    #[test]
    fn test_report_json_round_trips() {
        let report = sample_report();
        let json = render_report(&report, OutputFormat::Json).unwrap();
        let back: DetectionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.total_anomalies, 1);
    }

    #[test]
    fn test_report_summary_one_line() {
        let report = sample_report();
        let line = render_report(&report, OutputFormat::Summary).unwrap();
        assert_eq!(line.lines().count(), 1);
        assert!(line.contains("1 anomalies"));
        assert!(line.contains("0 campaigns failed"));
    }

    #[test]
    fn test_report_metrics_keys() {
        let report = sample_report();
        let metrics = render_report(&report, OutputFormat::Metrics).unwrap();
        assert!(metrics.contains("spendwatch_rows_total=2"));
        assert!(metrics.contains("spendwatch_anomalies_total=1"));
        assert!(metrics.contains("spendwatch_anomalies_high=1"));
        // Every line is key=value.
        for line in metrics.lines() {
            assert!(line.contains('='), "not key=value: {}", line);
        }
    }

    #[test]
    fn test_report_markdown_has_anomaly_table() {
        let report = sample_report();
        let md = render_report(&report, OutputFormat::Md).unwrap();
        assert!(md.starts_with("# Spend Deviation Report"));
        assert!(md.contains("## Anomalies"));
        assert!(md.contains("| camp-001 |"));
        // No failures, so no failure section.
        assert!(!md.contains("## Failed campaigns"));
    }

    #[test]
    fn test_report_markdown_failure_section() {
        let source = MemorySource::new()
            .with_performance(vec![PerformanceObservation::new("camp-001", ts(), 100.0)])
            .with_forecasts(vec![ForecastObservation::new("camp-001", ts(), 100.0)])
            .with_fetch_failure("camp-001");
        let config = Config::load_defaults().unwrap();
        let report = run_detection(&source, &[], &TimeWindow::all(), &config, None).unwrap();

        let md = render_report(&report, OutputFormat::Md).unwrap();
        assert!(md.contains("## Failed campaigns"));
        assert!(md.contains("| camp-001 | 30 |"));
    }

    #[test]
    fn test_deviation_formats() {
        let d = classify("camp-001", ts(), 115.0, 100.0, &ThresholdSet::default());

        let json = render_deviation(&d, OutputFormat::Json).unwrap();
        assert!(json.contains("\"tier\": \"l1\""));

        let line = render_deviation(&d, OutputFormat::Summary).unwrap();
        assert!(line.contains("anomaly (low)"));
        assert!(line.contains("15.0%"));

        let metrics = render_deviation(&d, OutputFormat::Metrics).unwrap();
        assert!(metrics.contains("spendwatch_is_anomaly=1"));
        assert!(metrics.contains("spendwatch_tier=l1"));
    }

    #[test]
    fn test_deviation_clean_summary() {
        let d = classify("camp-001", ts(), 105.0, 100.0, &ThresholdSet::default());
        let line = render_deviation(&d, OutputFormat::Summary).unwrap();
        assert!(line.contains("within thresholds"));
    }

    #[test]
    fn test_history_markdown_empty() {
        let md = render_history(&[], OutputFormat::Md).unwrap();
        assert!(md.contains("No records."));
    }

    #[test]
    fn test_config_summary() {
        let config = Config::load_defaults().unwrap();
        let line = render_config(&config, OutputFormat::Summary).unwrap();
        assert!(line.contains("thresholds 15/30/50"));
        assert!(line.contains("retention=90d"));
    }

    #[test]
    fn test_presets_markdown_lists_all() {
        let presets = list_presets();
        let md = render_presets(&presets, OutputFormat::Md).unwrap();
        for p in &presets {
            assert!(md.contains(&format!("| {} |", p.name)));
        }
    }
}
