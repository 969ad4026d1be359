//! Dashboard statistics: incident rollups, forecast event rollups, and
//! period-over-period metric trends.
//!
//! Everything here is a pure reduction over already-fetched slices.
//! Functions that depend on "today" take it as a parameter so the
//! rollups stay deterministic under test.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use sw_stats::{compensated_sum, mean, percent_change, round1, Trend};

use crate::model::DailyAnalytics;

// ============================================================================
// Incidents
// ============================================================================

/// Incident severity as recorded by the operations team.
///
/// A wider scale than anomaly severity: incidents can be escalated to
/// `critical` by a human even when the triggering anomaly was not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Incident lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Newly detected, nobody assigned yet.
    Open,
    /// Being worked.
    Investigating,
    /// Fixed; `duration` records the time to resolution.
    Resolved,
    /// Dismissed as noise.
    FalsePositive,
}

impl IncidentStatus {
    /// Whether the incident still needs attention. Investigating
    /// incidents count as open on the dashboard.
    pub fn is_open(&self) -> bool {
        matches!(self, IncidentStatus::Open | IncidentStatus::Investigating)
    }
}

/// One incident record as shown on the incident board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Incident {
    /// Stable incident id.
    pub id: String,

    /// Short human title.
    pub title: String,

    /// Operator-assigned severity.
    pub severity: IncidentSeverity,

    /// Lifecycle status.
    pub status: IncidentStatus,

    /// When the incident was detected.
    pub detected_at: DateTime<Utc>,

    /// When it was resolved, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    /// Time to resolution as "Xh Ym", set when the incident resolves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Estimated financial loss in currency units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_loss: Option<f64>,
}

/// Incident board rollup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct IncidentStatistics {
    /// All incidents in the slice.
    pub total: usize,

    /// Open plus investigating.
    pub open: usize,

    /// Resolved incidents.
    pub resolved: usize,

    /// Incidents dismissed as false positives.
    pub false_positives: usize,

    /// Count at severity critical.
    pub critical: usize,

    /// Count at severity high.
    pub high: usize,

    /// Count at severity medium.
    pub medium: usize,

    /// Count at severity low.
    pub low: usize,

    /// Summed financial loss across all incidents.
    pub total_financial_loss: f64,

    /// Mean time to resolution in hours, one decimal. Zero when no
    /// resolved incident carries a parseable duration.
    pub avg_resolution_hours: f64,
}

impl IncidentStatistics {
    /// Roll up a slice of incidents.
    ///
    /// Resolution time averages over resolved incidents whose duration
    /// string parses; unparseable durations are skipped entirely.
    pub fn from_incidents(incidents: &[Incident]) -> IncidentStatistics {
        let mut stats = IncidentStatistics {
            total: incidents.len(),
            ..IncidentStatistics::default()
        };

        for incident in incidents {
            match incident.status {
                IncidentStatus::Open | IncidentStatus::Investigating => stats.open += 1,
                IncidentStatus::Resolved => stats.resolved += 1,
                IncidentStatus::FalsePositive => stats.false_positives += 1,
            }
            match incident.severity {
                IncidentSeverity::Critical => stats.critical += 1,
                IncidentSeverity::High => stats.high += 1,
                IncidentSeverity::Medium => stats.medium += 1,
                IncidentSeverity::Low => stats.low += 1,
            }
        }

        stats.total_financial_loss = compensated_sum(
            incidents
                .iter()
                .map(|i| i.financial_loss.unwrap_or(0.0)),
        );

        let resolution_hours: Vec<f64> = incidents
            .iter()
            .filter(|i| i.status == IncidentStatus::Resolved)
            .filter_map(|i| i.duration.as_deref())
            .filter_map(parse_duration_hours)
            .collect();
        if !resolution_hours.is_empty() {
            stats.avg_resolution_hours = round1(mean(&resolution_hours));
        }

        stats
    }
}

/// Parse an "Xh Ym" duration string into fractional hours.
///
/// Returns `None` when the string does not match the pattern.
pub fn parse_duration_hours(duration: &str) -> Option<f64> {
    static DURATION_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        DURATION_PATTERN.get_or_init(|| Regex::new(r"(\d+)h\s+(\d+)m").expect("valid pattern"));
    let captures = pattern.captures(duration)?;
    let hours: f64 = captures.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = captures.get(2)?.as_str().parse().ok()?;
    Some(hours + minutes / 60.0)
}

/// Format the span between detection and resolution as "Xh Ym".
///
/// Negative spans clamp to "0h 0m".
pub fn format_duration(detected_at: DateTime<Utc>, resolved_at: DateTime<Utc>) -> String {
    let minutes = (resolved_at - detected_at).num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

// ============================================================================
// Forecast events
// ============================================================================

/// Priority assigned to a planned traffic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Low,
    Medium,
    High,
}

/// A planned event the forecast accounts for (sale, launch, campaign
/// push).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastEvent {
    /// Stable event id.
    pub id: String,

    /// Event name.
    pub name: String,

    /// Calendar day the event falls on.
    pub date: NaiveDate,

    /// Expected visitors.
    pub expected_traffic: u64,

    /// Expected revenue in currency units.
    pub expected_revenue: f64,

    /// Expected ad spend in currency units.
    pub expected_ad_spend: f64,

    /// Planning priority.
    pub priority: EventPriority,
}

/// Forecast planning rollup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ForecastStatistics {
    /// Events in the slice.
    pub total_events: usize,

    /// Summed expected visitors.
    pub total_expected_traffic: u64,

    /// Summed expected revenue.
    pub total_expected_revenue: f64,

    /// Summed expected ad spend.
    pub total_expected_ad_spend: f64,

    /// Events at priority high.
    pub high_priority: usize,

    /// Events at priority medium.
    pub medium_priority: usize,

    /// Events at priority low.
    pub low_priority: usize,

    /// Date of the next event on or after `today`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_event_date: Option<NaiveDate>,
}

impl ForecastStatistics {
    /// Roll up a slice of forecast events relative to `today`.
    pub fn from_events(events: &[ForecastEvent], today: NaiveDate) -> ForecastStatistics {
        let mut stats = ForecastStatistics {
            total_events: events.len(),
            ..ForecastStatistics::default()
        };

        for event in events {
            stats.total_expected_traffic += event.expected_traffic;
            match event.priority {
                EventPriority::High => stats.high_priority += 1,
                EventPriority::Medium => stats.medium_priority += 1,
                EventPriority::Low => stats.low_priority += 1,
            }
        }
        stats.total_expected_revenue =
            compensated_sum(events.iter().map(|e| e.expected_revenue));
        stats.total_expected_ad_spend =
            compensated_sum(events.iter().map(|e| e.expected_ad_spend));

        stats.next_event_date = events
            .iter()
            .filter(|e| e.date >= today)
            .map(|e| e.date)
            .min();

        stats
    }
}

// ============================================================================
// Metric trends
// ============================================================================

/// Period-over-period trends for the dashboard metric cards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardTrends {
    /// Ad spend trend.
    pub ad_spend: Trend,

    /// Clicks trend.
    pub clicks: Trend,

    /// Impressions trend.
    pub impressions: Trend,

    /// Unique users trend.
    pub unique_users: Trend,
}

impl DashboardTrends {
    /// Compare one day's rollup against the previous day's.
    pub fn between(previous: &DailyAnalytics, current: &DailyAnalytics) -> DashboardTrends {
        DashboardTrends {
            ad_spend: percent_change(current.total_ad_spend, previous.total_ad_spend),
            clicks: percent_change(current.total_clicks as f64, previous.total_clicks as f64),
            impressions: percent_change(
                current.total_impressions as f64,
                previous.total_impressions as f64,
            ),
            unique_users: percent_change(
                current.total_unique_users as f64,
                previous.total_unique_users as f64,
            ),
        }
    }
}
