//! Detection pipeline: fetch, validate, join, classify, aggregate, record.
//!
//! One call to [`run_detection`] processes a set of campaigns against a
//! data source. Campaigns fail independently; a fetch or validation
//! error on one campaign is collected into the batch while the rest
//! still classify. Sink failures abort the run, a ledger that stops
//! accepting writes is not something to paper over.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, span, warn, Level};

use sw_common::{BatchResult, CampaignId, RunId, SCHEMA_VERSION};
use sw_config::Config;

use crate::aggregate::DeviationSummary;
use crate::classify::classify;
use crate::exit_codes::ExitCode;
use crate::history::AnomalyRecord;
use crate::join::{join_observations, validate_forecasts, validate_performance, JoinReport};
use crate::model::ClassifiedDeviation;
use crate::source::{AnomalySink, SpendDataSource, TimeWindow};

/// Outcome of one campaign within a detection run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CampaignResult {
    /// Campaign that was processed.
    pub campaign_id: CampaignId,

    /// Display label (campaign name when the source has one, else the id).
    pub label: String,

    /// Rows that went through the classifier.
    pub rows: usize,

    /// Rows classified as anomalous.
    pub anomalies: usize,

    /// Join accounting for this campaign alone.
    pub join: JoinReport,
}

/// Result of a full detection run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectionReport {
    /// Wire schema version.
    pub schema_version: String,

    /// Run identifier, also stamped on persisted anomaly records.
    pub run_id: RunId,

    /// When the run completed.
    pub generated_at: DateTime<Utc>,

    /// Observation window the run covered.
    pub window: TimeWindow,

    /// Per-campaign outcomes, including campaigns that failed to fetch
    /// or validate.
    pub campaigns: BatchResult<CampaignResult>,

    /// Every classified row across all successful campaigns, in
    /// campaign order then performance-feed order.
    pub deviations: Vec<ClassifiedDeviation>,

    /// Aggregated counts over `deviations`.
    pub summary: DeviationSummary,

    /// Join accounting across all successful campaigns.
    pub join_report: JoinReport,

    /// Anomaly records appended to the sink during this run.
    pub anomalies_recorded: usize,
}

impl DetectionReport {
    /// The classified rows that are anomalous.
    pub fn anomalies(&self) -> impl Iterator<Item = &ClassifiedDeviation> {
        self.deviations.iter().filter(|d| d.is_anomaly)
    }

    /// Exit code for this run. Partial source failure outranks
    /// anomalies-found: a wrapper must know the window is incomplete
    /// before it trusts the counts.
    pub fn exit_code(&self) -> ExitCode {
        if !self.campaigns.failed.is_empty() {
            ExitCode::PartialSourceFail
        } else if self.summary.total_anomalies > 0 {
            ExitCode::AnomaliesFound
        } else {
            ExitCode::Clean
        }
    }
}

/// Run detection for `campaigns` over `window`.
///
/// An empty campaign list means every campaign the source knows about.
/// Anomalies are appended to `sink` when the policy says to record them
/// and a sink is supplied.
pub fn run_detection<S: SpendDataSource>(
    source: &S,
    campaigns: &[CampaignId],
    window: &TimeWindow,
    config: &Config,
    mut sink: Option<&mut dyn AnomalySink>,
) -> sw_common::Result<DetectionReport> {
    let run_id = RunId::new();
    let _span = span!(Level::INFO, "run_detection", run_id = %run_id.0).entered();

    let targets: Vec<CampaignId> = if campaigns.is_empty() {
        source.campaign_ids()
    } else {
        campaigns.to_vec()
    };
    info!(campaigns = targets.len(), "starting detection run");

    let mut batch: BatchResult<CampaignResult> = BatchResult::default();
    let mut deviations: Vec<ClassifiedDeviation> = Vec::new();
    let mut join_report = JoinReport::default();
    let mut anomalies_recorded = 0usize;

    for campaign_id in &targets {
        match detect_campaign(source, campaign_id, window, config) {
            Ok((result, campaign_deviations)) => {
                join_report.merge(&result.join);

                if config.policy.record_anomalies {
                    if let Some(sink) = sink.as_deref_mut() {
                        for deviation in campaign_deviations.iter().filter(|d| d.is_anomaly) {
                            let record =
                                AnomalyRecord::from_deviation(deviation, &result.label, &run_id);
                            sink.record(&record)?;
                            anomalies_recorded += 1;
                        }
                    }
                }

                debug!(
                    campaign = %campaign_id,
                    rows = result.rows,
                    anomalies = result.anomalies,
                    "campaign processed"
                );
                deviations.extend(campaign_deviations);
                batch.add_success(result);
            }
            Err(err) => {
                warn!(campaign = %campaign_id, error = %err, "campaign failed");
                batch.add_failure(campaign_id.as_str(), &err);
            }
        }
    }

    let summary = DeviationSummary::from_deviations(&deviations);
    info!(
        rows = summary.total_rows,
        anomalies = summary.total_anomalies,
        failed_campaigns = batch.failed.len(),
        recorded = anomalies_recorded,
        "detection run complete"
    );

    Ok(DetectionReport {
        schema_version: SCHEMA_VERSION.to_string(),
        run_id,
        generated_at: Utc::now(),
        window: *window,
        campaigns: batch,
        deviations,
        summary,
        join_report,
        anomalies_recorded,
    })
}

/// Fetch, validate, join, and classify one campaign.
fn detect_campaign<S: SpendDataSource>(
    source: &S,
    campaign_id: &CampaignId,
    window: &TimeWindow,
    config: &Config,
) -> sw_common::Result<(CampaignResult, Vec<ClassifiedDeviation>)> {
    let label = source
        .campaign_name(campaign_id)
        .unwrap_or_else(|| campaign_id.as_str().to_string());

    let performance = source.fetch_performance(campaign_id, window)?;
    let forecasts = source.fetch_forecasts(campaign_id, window)?;

    let performance = validate_performance(performance, config.policy.invalid_spend)?;
    let forecasts = validate_forecasts(forecasts, config.policy.invalid_spend)?;

    let (pairs, join) = join_observations(&performance, &forecasts, config.policy.missing_forecast);

    let mut campaign_deviations = Vec::with_capacity(pairs.len());
    for pair in &pairs {
        campaign_deviations.push(classify(
            pair.campaign_id.clone(),
            pair.timestamp,
            pair.actual_spend,
            pair.forecast_spend,
            &config.thresholds,
        ));
    }

    let anomalies = campaign_deviations.iter().filter(|d| d.is_anomaly).count();
    let result = CampaignResult {
        campaign_id: campaign_id.clone(),
        label,
        rows: campaign_deviations.len(),
        anomalies,
        join,
    };
    Ok((result, campaign_deviations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForecastObservation, PerformanceObservation, Severity};
    use crate::source::{MemorySink, MemorySource};
    use chrono::TimeZone;
    use sw_config::MissingForecastPolicy;

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, h, 0, 0).unwrap()
    }

    // Two campaigns. camp-001 has one L3 spike at 11:00; camp-002 is on
    // forecast all day.
    fn sample_source() -> MemorySource {
        MemorySource::new()
            .with_performance(vec![
                PerformanceObservation::new("camp-001", hour(10), 100.0),
                PerformanceObservation::new("camp-001", hour(11), 250.0),
                PerformanceObservation::new("camp-002", hour(10), 52.0),
                PerformanceObservation::new("camp-002", hour(11), 48.0),
            ])
            .with_forecasts(vec![
                ForecastObservation::new("camp-001", hour(10), 100.0),
                ForecastObservation::new("camp-001", hour(11), 100.0),
                ForecastObservation::new("camp-002", hour(10), 50.0),
                ForecastObservation::new("camp-002", hour(11), 50.0),
            ])
            .with_campaign_name("camp-001", "Spring Sale")
    }

    fn defaults() -> Config {
        Config::load_defaults().unwrap()
    }

    #[test]
    fn test_run_detects_anomalies() {
        let source = sample_source();
        let report = run_detection(&source, &[], &TimeWindow::all(), &defaults(), None).unwrap();

        assert_eq!(report.deviations.len(), 4);
        assert_eq!(report.summary.total_anomalies, 1);
        assert_eq!(report.summary.severity_count(Severity::High), 1);
        assert_eq!(report.exit_code(), ExitCode::AnomaliesFound);

        let anomaly = report.anomalies().next().unwrap();
        assert_eq!(anomaly.campaign_id.as_str(), "camp-001");
        assert_eq!(anomaly.timestamp, hour(11));
    }

    #[test]
    fn test_clean_run_exit_code() {
        let source = MemorySource::new()
            .with_performance(vec![PerformanceObservation::new("camp-001", hour(10), 102.0)])
            .with_forecasts(vec![ForecastObservation::new("camp-001", hour(10), 100.0)]);

        let report = run_detection(&source, &[], &TimeWindow::all(), &defaults(), None).unwrap();
        assert_eq!(report.summary.total_anomalies, 0);
        assert_eq!(report.exit_code(), ExitCode::Clean);
    }

    #[test]
    fn test_empty_campaign_list_means_all() {
        let source = sample_source();
        let report = run_detection(&source, &[], &TimeWindow::all(), &defaults(), None).unwrap();
        assert_eq!(report.campaigns.succeeded.len(), 2);
    }

    #[test]
    fn test_explicit_campaign_subset() {
        let source = sample_source();
        let report = run_detection(
            &source,
            &[CampaignId::from("camp-002")],
            &TimeWindow::all(),
            &defaults(),
            None,
        )
        .unwrap();

        assert_eq!(report.campaigns.succeeded.len(), 1);
        assert_eq!(report.deviations.len(), 2);
        assert_eq!(report.summary.total_anomalies, 0);
    }

    #[test]
    fn test_window_restricts_rows() {
        let source = sample_source();
        let window = TimeWindow::between(hour(10), hour(10));
        let report = run_detection(&source, &[], &window, &defaults(), None).unwrap();

        // Only the 10:00 rows survive, which excludes the 11:00 spike.
        assert_eq!(report.deviations.len(), 2);
        assert_eq!(report.summary.total_anomalies, 0);
    }

    #[test]
    fn test_partial_source_failure() {
        let source = sample_source().with_fetch_failure("camp-001");
        let report = run_detection(&source, &[], &TimeWindow::all(), &defaults(), None).unwrap();

        assert_eq!(report.campaigns.succeeded.len(), 1);
        assert_eq!(report.campaigns.failed.len(), 1);
        assert_eq!(report.campaigns.failed[0].item_id, "camp-001");
        assert!(!report.campaigns.summary.all_succeeded);
        assert!(report.campaigns.summary.any_succeeded);

        // camp-002 still classified.
        assert_eq!(report.deviations.len(), 2);

        // Partial failure outranks everything else.
        assert_eq!(report.exit_code(), ExitCode::PartialSourceFail);
    }

    #[test]
    fn test_validation_failure_is_per_campaign() {
        let source = sample_source().with_performance(vec![PerformanceObservation::new(
            "camp-003",
            hour(10),
            -5.0,
        )]);

        let report = run_detection(&source, &[], &TimeWindow::all(), &defaults(), None).unwrap();
        assert_eq!(report.campaigns.failed.len(), 1);
        assert_eq!(report.campaigns.failed[0].item_id, "camp-003");
        assert_eq!(report.campaigns.failed[0].error.code, 21);

        // The healthy campaigns are unaffected.
        assert_eq!(report.campaigns.succeeded.len(), 2);
    }

    #[test]
    fn test_sink_receives_anomalies() {
        let source = sample_source();
        let mut sink = MemorySink::new();
        let report = run_detection(
            &source,
            &[],
            &TimeWindow::all(),
            &defaults(),
            Some(&mut sink),
        )
        .unwrap();

        assert_eq!(report.anomalies_recorded, 1);
        assert_eq!(sink.recorded().len(), 1);

        let record = &sink.recorded()[0];
        assert_eq!(record.campaign, "Spring Sale");
        assert_eq!(record.campaign_id.as_str(), "camp-001");
        assert_eq!(record.run_id, report.run_id);
        assert_eq!(record.value, 250.0);
        assert_eq!(record.expected, 100.0);
    }

    #[test]
    fn test_policy_can_disable_recording() {
        let source = sample_source();
        let mut config = defaults();
        config.policy.record_anomalies = false;

        let mut sink = MemorySink::new();
        let report = run_detection(
            &source,
            &[],
            &TimeWindow::all(),
            &config,
            Some(&mut sink),
        )
        .unwrap();

        assert_eq!(report.anomalies_recorded, 0);
        assert!(sink.recorded().is_empty());
        // Detection itself is unaffected.
        assert_eq!(report.summary.total_anomalies, 1);
    }

    #[test]
    fn test_label_falls_back_to_id() {
        let source = sample_source();
        let report = run_detection(&source, &[], &TimeWindow::all(), &defaults(), None).unwrap();

        let by_id: std::collections::HashMap<&str, &str> = report
            .campaigns
            .succeeded
            .iter()
            .map(|c| (c.campaign_id.as_str(), c.label.as_str()))
            .collect();
        assert_eq!(by_id["camp-001"], "Spring Sale");
        assert_eq!(by_id["camp-002"], "camp-002");
    }

    #[test]
    fn test_exclude_policy_flows_into_join_report() {
        let source = MemorySource::new().with_performance(vec![
            PerformanceObservation::new("camp-001", hour(10), 75.0),
        ]);
        let mut config = defaults();
        config.policy.missing_forecast = MissingForecastPolicy::Exclude;

        let report = run_detection(&source, &[], &TimeWindow::all(), &config, None).unwrap();
        assert_eq!(report.join_report.excluded, 1);
        assert!(report.deviations.is_empty());
        assert_eq!(report.exit_code(), ExitCode::Clean);
    }

    #[test]
    fn test_join_report_merges_across_campaigns() {
        let source = sample_source().with_performance(vec![
            // No forecast for this hour; default policy zero-fills.
            PerformanceObservation::new("camp-002", hour(12), 60.0),
        ]);

        let report = run_detection(&source, &[], &TimeWindow::all(), &defaults(), None).unwrap();
        assert_eq!(report.join_report.matched, 4);
        assert_eq!(report.join_report.zero_filled, 1);
        assert_eq!(report.join_report.total_rows(), 5);
    }

    #[test]
    fn test_report_serializes() {
        let source = sample_source();
        let report = run_detection(&source, &[], &TimeWindow::all(), &defaults(), None).unwrap();

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"schema_version\":\"1.0.0\""));
        assert!(json.contains("\"run_id\""));

        let back: DetectionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.total_anomalies, 1);
    }
}
