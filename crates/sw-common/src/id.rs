//! Campaign and run identity types.
//!
//! A deviation is keyed by (campaign_id, timestamp); detection runs are
//! tracked by a RunId so persisted anomaly records can be traced back to
//! the run that produced them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Campaign identifier used as the join key between performance and
/// forecast observations.
///
/// Opaque to the classifier; typically a UUID or slug assigned by the
/// upstream data store.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct CampaignId(pub String);

impl CampaignId {
    /// Borrow the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CampaignId {
    fn from(s: &str) -> Self {
        CampaignId(s.to_string())
    }
}

impl From<String> for CampaignId {
    fn from(s: String) -> Self {
        CampaignId(s)
    }
}

/// Exact join key for pairing performance and forecast observations.
///
/// Matching is exact on both components; there is no tolerance window
/// on the timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ObservationKey {
    /// Campaign the observation belongs to.
    pub campaign_id: CampaignId,
    /// Time bucket of the observation (one row per campaign-hour upstream).
    pub timestamp: DateTime<Utc>,
}

impl ObservationKey {
    /// Build a key from its components.
    pub fn new(campaign_id: impl Into<CampaignId>, timestamp: DateTime<Utc>) -> Self {
        ObservationKey {
            campaign_id: campaign_id.into(),
            timestamp,
        }
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.campaign_id, self.timestamp.to_rfc3339())
    }
}

/// Run ID for tracking detection runs.
///
/// Format: `sw-YYYYMMDD-HHMMSS-XXXX`
/// Example: `sw-20260115-143022-a7xq`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new run ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let suffix = generate_base32_suffix();
        RunId(format!(
            "sw-{}-{}-{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            suffix
        ))
    }

    /// Parse an existing run ID string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 23 {
            return None;
        }
        let bytes = s.as_bytes();
        if bytes.first() != Some(&b's')
            || bytes.get(1) != Some(&b'w')
            || bytes.get(2) != Some(&b'-')
            || bytes.get(11) != Some(&b'-')
            || bytes.get(18) != Some(&b'-')
        {
            return None;
        }
        let date = &s[3..11];
        let time = &s[12..18];
        let suffix = &s[19..23];
        if !date.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !time.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !suffix.chars().all(|c| matches!(c, 'a'..='z' | '2'..='7')) {
            return None;
        }
        Some(RunId(s.to_string()))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn generate_base32_suffix() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    let mut value = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32);
    value &= 0x000F_FFFF;
    let alphabet = b"abcdefghijklmnopqrstuvwxyz234567";
    let mut out = String::with_capacity(4);
    for shift in [15_u32, 10, 5, 0] {
        let idx = ((value >> shift) & 0x1F) as usize;
        out.push(alphabet[idx] as char);
    }
    out
}
