//! Alert escalation ladder for unacknowledged anomalies.
//!
//! An anomaly opens an alert at a level derived from its severity.
//! Each level has an acknowledgment SLA; when the SLA lapses without
//! an acknowledgment the alert climbs to the next level and notifies a
//! wider audience. L3 is the top: a lapsed L3 is reported as exhausted
//! rather than escalated further.
//!
//! The decision logic is a pure function over timestamps. No timers
//! live here; callers evaluate on their own schedule and apply the
//! returned decision.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use sw_common::CampaignId;

use crate::model::Severity;

// ---------------------------------------------------------------------------
// Alert levels
// ---------------------------------------------------------------------------

/// Escalation level of an open alert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum AlertLevel {
    /// First responders. Tightest acknowledgment window.
    L1,
    /// On-call leads.
    L2,
    /// Engineering management. Last rung of the ladder.
    L3,
}

impl AlertLevel {
    /// All levels in escalation order.
    pub const ALL: &'static [AlertLevel] = &[AlertLevel::L1, AlertLevel::L2, AlertLevel::L3];

    /// Acknowledgment SLA for this level.
    pub fn ack_sla(&self) -> Duration {
        match self {
            AlertLevel::L1 => Duration::minutes(5),
            AlertLevel::L2 => Duration::minutes(15),
            AlertLevel::L3 => Duration::minutes(30),
        }
    }

    /// The next level up, or `None` at the top of the ladder.
    pub fn next(&self) -> Option<AlertLevel> {
        match self {
            AlertLevel::L1 => Some(AlertLevel::L2),
            AlertLevel::L2 => Some(AlertLevel::L3),
            AlertLevel::L3 => None,
        }
    }

    /// Role notified at this level.
    pub fn notified_role(&self) -> &'static str {
        match self {
            AlertLevel::L1 => "first_responders",
            AlertLevel::L2 => "on_call_leads",
            AlertLevel::L3 => "engineering_management",
        }
    }

    /// Initial level for a freshly classified anomaly.
    pub fn for_severity(severity: Severity) -> AlertLevel {
        match severity {
            Severity::Low => AlertLevel::L1,
            Severity::Medium => AlertLevel::L2,
            Severity::High => AlertLevel::L3,
        }
    }

    /// Level name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::L1 => "L1",
            AlertLevel::L2 => "L2",
            AlertLevel::L3 => "L3",
        }
    }

    /// Parse a level name.
    pub fn parse(s: &str) -> Option<AlertLevel> {
        match s.to_uppercase().as_str() {
            "L1" => Some(AlertLevel::L1),
            "L2" => Some(AlertLevel::L2),
            "L3" => Some(AlertLevel::L3),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Alert state
// ---------------------------------------------------------------------------

/// One open alert moving through the escalation ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EscalationState {
    /// Campaign the triggering anomaly belongs to.
    pub campaign_id: CampaignId,

    /// Severity of the triggering anomaly.
    pub severity: Severity,

    /// Current level.
    pub level: AlertLevel,

    /// When the current level was raised. Reset on each escalation so
    /// every level gets its full SLA.
    pub level_raised_at: DateTime<Utc>,

    /// When the alert was acknowledged, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,

    /// Escalations applied so far.
    pub total_escalations: u32,
}

impl EscalationState {
    /// Open an alert for an anomaly at the level its severity maps to.
    pub fn open(campaign_id: impl Into<CampaignId>, severity: Severity, now: DateTime<Utc>) -> Self {
        EscalationState {
            campaign_id: campaign_id.into(),
            severity,
            level: AlertLevel::for_severity(severity),
            level_raised_at: now,
            acknowledged_at: None,
            total_escalations: 0,
        }
    }

    /// Acknowledge the alert, closing the escalation chain.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) {
        if self.acknowledged_at.is_none() {
            self.acknowledged_at = Some(now);
        }
    }

    /// Whether the chain is closed.
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }

    /// Apply an [`EscalationDecision::Escalate`] decision.
    pub fn escalate_to(&mut self, level: AlertLevel, now: DateTime<Utc>) {
        self.level = level;
        self.level_raised_at = now;
        self.total_escalations += 1;
    }

    /// Time remaining in the current level's SLA, clamped at zero.
    pub fn sla_remaining(&self, now: DateTime<Utc>) -> Duration {
        let deadline = self.level_raised_at + self.level.ack_sla();
        (deadline - now).max(Duration::zero())
    }
}

// ---------------------------------------------------------------------------
// Decision logic
// ---------------------------------------------------------------------------

/// What to do with an open alert at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", content = "level", rename_all = "snake_case")]
pub enum EscalationDecision {
    /// SLA not lapsed, or the alert is acknowledged. Do nothing.
    Hold,
    /// SLA lapsed; raise the alert to the given level.
    Escalate(AlertLevel),
    /// L3 SLA lapsed with no acknowledgment. Ladder is out of rungs;
    /// the alert needs out-of-band attention.
    Exhausted,
}

/// Evaluate an open alert against the clock.
///
/// Acknowledged alerts always hold. An SLA lapse on L1 or L2 escalates
/// one rung; a lapse on L3 is exhaustion. The SLA boundary itself is a
/// lapse (`>=`).
pub fn evaluate_escalation(state: &EscalationState, now: DateTime<Utc>) -> EscalationDecision {
    if state.is_acknowledged() {
        return EscalationDecision::Hold;
    }
    let elapsed = now - state.level_raised_at;
    if elapsed < state.level.ack_sla() {
        return EscalationDecision::Hold;
    }
    match state.level.next() {
        Some(next) => EscalationDecision::Escalate(next),
        None => EscalationDecision::Exhausted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap()
    }

    fn minutes(m: i64) -> Duration {
        Duration::minutes(m)
    }

    #[test]
    fn test_sla_per_level() {
        assert_eq!(AlertLevel::L1.ack_sla(), minutes(5));
        assert_eq!(AlertLevel::L2.ack_sla(), minutes(15));
        assert_eq!(AlertLevel::L3.ack_sla(), minutes(30));
    }

    #[test]
    fn test_severity_to_initial_level() {
        assert_eq!(AlertLevel::for_severity(Severity::Low), AlertLevel::L1);
        assert_eq!(AlertLevel::for_severity(Severity::Medium), AlertLevel::L2);
        assert_eq!(AlertLevel::for_severity(Severity::High), AlertLevel::L3);
    }

    #[test]
    fn test_ladder_order() {
        assert_eq!(AlertLevel::L1.next(), Some(AlertLevel::L2));
        assert_eq!(AlertLevel::L2.next(), Some(AlertLevel::L3));
        assert_eq!(AlertLevel::L3.next(), None);
        assert!(AlertLevel::L1 < AlertLevel::L3);
    }

    #[test]
    fn test_level_parse_roundtrip() {
        for level in AlertLevel::ALL {
            assert_eq!(AlertLevel::parse(level.as_str()), Some(*level));
        }
        assert_eq!(AlertLevel::parse("l2"), Some(AlertLevel::L2));
        assert_eq!(AlertLevel::parse("L9"), None);
    }

    #[test]
    fn test_hold_within_sla() {
        let state = EscalationState::open("camp-001", Severity::Low, t0());
        let decision = evaluate_escalation(&state, t0() + minutes(4));
        assert_eq!(decision, EscalationDecision::Hold);
    }

    #[test]
    fn test_escalates_at_sla_boundary() {
        // Exactly at the deadline counts as lapsed.
        let state = EscalationState::open("camp-001", Severity::Low, t0());
        let decision = evaluate_escalation(&state, t0() + minutes(5));
        assert_eq!(decision, EscalationDecision::Escalate(AlertLevel::L2));
    }

    #[test]
    fn test_full_ladder_walk() {
        let mut state = EscalationState::open("camp-001", Severity::Low, t0());
        assert_eq!(state.level, AlertLevel::L1);

        // L1 lapses after 5 minutes.
        let now = t0() + minutes(6);
        match evaluate_escalation(&state, now) {
            EscalationDecision::Escalate(next) => state.escalate_to(next, now),
            other => panic!("expected escalate, got {:?}", other),
        }
        assert_eq!(state.level, AlertLevel::L2);
        assert_eq!(state.total_escalations, 1);

        // L2 gets a fresh 15 minute window from the escalation.
        assert_eq!(
            evaluate_escalation(&state, now + minutes(14)),
            EscalationDecision::Hold
        );
        let now = now + minutes(15);
        match evaluate_escalation(&state, now) {
            EscalationDecision::Escalate(next) => state.escalate_to(next, now),
            other => panic!("expected escalate, got {:?}", other),
        }
        assert_eq!(state.level, AlertLevel::L3);

        // A lapsed L3 is exhaustion, not a further escalation.
        assert_eq!(
            evaluate_escalation(&state, now + minutes(30)),
            EscalationDecision::Exhausted
        );
        assert_eq!(state.total_escalations, 2);
    }

    #[test]
    fn test_acknowledgment_closes_chain() {
        let mut state = EscalationState::open("camp-001", Severity::Medium, t0());
        state.acknowledge(t0() + minutes(2));

        // Even far past every SLA, an acknowledged alert holds.
        assert_eq!(
            evaluate_escalation(&state, t0() + minutes(120)),
            EscalationDecision::Hold
        );
    }

    #[test]
    fn test_acknowledge_is_idempotent() {
        let mut state = EscalationState::open("camp-001", Severity::High, t0());
        state.acknowledge(t0() + minutes(1));
        let first = state.acknowledged_at;
        state.acknowledge(t0() + minutes(10));
        assert_eq!(state.acknowledged_at, first);
    }

    #[test]
    fn test_high_severity_starts_at_top() {
        let state = EscalationState::open("camp-001", Severity::High, t0());
        assert_eq!(state.level, AlertLevel::L3);
        // The only way off L3 without acknowledgment is exhaustion.
        assert_eq!(
            evaluate_escalation(&state, t0() + minutes(31)),
            EscalationDecision::Exhausted
        );
    }

    #[test]
    fn test_sla_remaining() {
        let state = EscalationState::open("camp-001", Severity::Low, t0());
        assert_eq!(state.sla_remaining(t0() + minutes(2)), minutes(3));
        assert_eq!(state.sla_remaining(t0() + minutes(9)), Duration::zero());
    }

    #[test]
    fn test_notified_roles_widen() {
        assert_eq!(AlertLevel::L1.notified_role(), "first_responders");
        assert_eq!(AlertLevel::L3.notified_role(), "engineering_management");
    }

    #[test]
    fn test_decision_serde_tagging() {
        let json = serde_json::to_string(&EscalationDecision::Escalate(AlertLevel::L2)).unwrap();
        assert!(json.contains(r#""action":"escalate""#));
        assert!(json.contains(r#""level":"L2""#));

        let hold = serde_json::to_string(&EscalationDecision::Hold).unwrap();
        assert!(hold.contains(r#""action":"hold""#));
    }
}
