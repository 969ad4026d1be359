//! Error types for Spendwatch.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! Errors can be formatted for human consumption with headline, reason, and fix:
//! ```text
//! ✗ Invalid Thresholds Configuration
//!   Reason: invalid thresholds file: l2 (10) must be greater than l1 (15)
//!   Fix: Run 'sw-core config validate', or start over from a preset.
//! ```
//!
//! # Machine-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 11,
//!   "category": "config",
//!   "message": "invalid thresholds file: parse error at line 5",
//!   "recoverable": true,
//!   "suggested_action": "reset_config",
//!   "context": { "file": "thresholds.json" }
//! }
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Spendwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors (thresholds, policy, schema).
    Config,
    /// Observation validation errors (negative or non-finite spend).
    Validation,
    /// Data source fetch and decode errors.
    Source,
    /// Anomaly history ledger errors.
    History,
    /// Report rendering errors.
    Render,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Source => write!(f, "source"),
            ErrorCategory::History => write!(f, "history"),
            ErrorCategory::Render => write!(f, "render"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for callers to take in response to errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation (possibly with backoff).
    Retry,
    /// Reset configuration to defaults or a preset.
    ResetConfig,
    /// Run validation/check command.
    RunCheck,
    /// Refetch observations from the data store.
    Refetch,
    /// Skip this item and continue.
    Skip,
    /// Abort the operation.
    Abort,
    /// Manual intervention required.
    ManualIntervention,
    /// No action needed (informational).
    None,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::ResetConfig => write!(f, "reset_config"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::Refetch => write!(f, "refetch"),
            SuggestedAction::Skip => write!(f, "skip"),
            SuggestedAction::Abort => write!(f, "abort"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
            SuggestedAction::None => write!(f, "none"),
        }
    }
}

/// Unified error type for Spendwatch.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid thresholds file: {0}")]
    InvalidThresholds(String),

    #[error("invalid policy file: {0}")]
    InvalidPolicy(String),

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    // Observation validation errors (20-29)
    #[error("observation validation failed: {0}")]
    Validation(String),

    #[error("negative {field} for campaign {campaign_id}: {value}")]
    NegativeSpend {
        campaign_id: String,
        field: String,
        value: f64,
    },

    #[error("non-finite {field} for campaign {campaign_id}")]
    NonFiniteSpend { campaign_id: String, field: String },

    // Data source errors (30-39)
    #[error("data source fetch failed: {0}")]
    Source(String),

    #[error("campaign not found: {campaign_id}")]
    CampaignNotFound { campaign_id: String },

    #[error("data source decode failed: {0}")]
    SourceDecode(String),

    // History ledger errors (40-49)
    #[error("history ledger error: {0}")]
    History(String),

    #[error("history ledger corrupted at {path}:{line}")]
    HistoryCorrupted { path: String, line: usize },

    // Rendering errors (50-59)
    #[error("render failed: {0}")]
    Render(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Observation validation errors
    /// - 30-39: Data source errors
    /// - 40-49: History ledger errors
    /// - 50-59: Rendering errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidThresholds(_) => 11,
            Error::InvalidPolicy(_) => 12,
            Error::SchemaValidation(_) => 13,
            Error::Validation(_) => 20,
            Error::NegativeSpend { .. } => 21,
            Error::NonFiniteSpend { .. } => 22,
            Error::Source(_) => 30,
            Error::CampaignNotFound { .. } => 31,
            Error::SourceDecode(_) => 32,
            Error::History(_) => 40,
            Error::HistoryCorrupted { .. } => 41,
            Error::Render(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_)
            | Error::InvalidThresholds(_)
            | Error::InvalidPolicy(_)
            | Error::SchemaValidation(_) => ErrorCategory::Config,

            Error::Validation(_)
            | Error::NegativeSpend { .. }
            | Error::NonFiniteSpend { .. } => ErrorCategory::Validation,

            Error::Source(_) | Error::CampaignNotFound { .. } | Error::SourceDecode(_) => {
                ErrorCategory::Source
            }

            Error::History(_) | Error::HistoryCorrupted { .. } => ErrorCategory::History,

            Error::Render(_) => ErrorCategory::Render,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Recoverable errors may be resolved by:
    /// - Retrying with a delay
    /// - Refetching observations
    /// - Resetting configuration
    /// - Switching to a clamping validation policy
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Config errors: recoverable by fixing/resetting config
            Error::Config(_) => true,
            Error::InvalidThresholds(_) => true,
            Error::InvalidPolicy(_) => true,
            Error::SchemaValidation(_) => true,

            // Validation: negative spend can be clamped by policy
            Error::Validation(_) => false,
            Error::NegativeSpend { .. } => true,
            Error::NonFiniteSpend { .. } => false, // No policy admits NaN/inf

            // Source: fetches are transient, missing campaigns are not
            Error::Source(_) => true,
            Error::CampaignNotFound { .. } => false, // Campaign is gone
            Error::SourceDecode(_) => false,         // Shape mismatch, retry won't help

            // History: append can be retried, corruption cannot
            Error::History(_) => true,
            Error::HistoryCorrupted { .. } => false,

            // Render: deterministic over its input
            Error::Render(_) => false,

            // I/O: often transient
            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns the suggested action for automated callers.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidThresholds(_) => SuggestedAction::ResetConfig,
            Error::InvalidPolicy(_) => SuggestedAction::ResetConfig,
            Error::SchemaValidation(_) => SuggestedAction::RunCheck,

            Error::Validation(_) => SuggestedAction::Skip,
            Error::NegativeSpend { .. } => SuggestedAction::Skip,
            Error::NonFiniteSpend { .. } => SuggestedAction::Skip,

            Error::Source(_) => SuggestedAction::Retry,
            Error::CampaignNotFound { .. } => SuggestedAction::Skip,
            Error::SourceDecode(_) => SuggestedAction::ManualIntervention,

            Error::History(_) => SuggestedAction::Retry,
            Error::HistoryCorrupted { .. } => SuggestedAction::ManualIntervention,

            Error::Render(_) => SuggestedAction::Abort,

            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Run 'sw-core config validate' to check configuration files, or fix syntax by hand."
            }
            Error::InvalidThresholds(_) => {
                "Run 'sw-core config validate', or start over from a preset listed by 'sw-core config presets'."
            }
            Error::InvalidPolicy(_) => {
                "Run 'sw-core config validate', or restore policy.json from a preset."
            }
            Error::SchemaValidation(_) => {
                "Ensure configuration files match the expected schema version. See 'sw-core schema'."
            }

            Error::Validation(_) => {
                "Fix the offending observation upstream, or rerun with a clamping policy."
            }
            Error::NegativeSpend { .. } => {
                "Negative spend usually indicates a refund row. Rerun with invalid_spend = clamp, or drop the row upstream."
            }
            Error::NonFiniteSpend { .. } => {
                "NaN or infinite spend cannot be classified under any policy. Drop the row upstream."
            }

            Error::Source(_) => {
                "Retry the fetch. If persistent, check connectivity to the data store."
            }
            Error::CampaignNotFound { .. } => {
                "The campaign does not exist in the data store. Check the id or refresh the campaign list."
            }
            Error::SourceDecode(_) => {
                "The data store returned rows that do not match the expected shape. Check schema versions on both sides."
            }

            Error::History(_) => {
                "Check disk space and permissions on the data directory, then retry."
            }
            Error::HistoryCorrupted { .. } => {
                "Corrupt ledger lines are skipped on read. Archive the file with 'sw-core history prune' if it keeps growing."
            }

            Error::Render(_) => {
                "Rendering is deterministic; this indicates a bug. Rerun with --format json and report it."
            }

            Error::Io(_) => {
                "Check disk space, permissions, and that the data directories exist. Retry the operation."
            }
            Error::Json(_) => {
                "Invalid JSON in file. Check syntax with 'jq .' or restore from backup."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidThresholds(_) => "Invalid Thresholds Configuration",
            Error::InvalidPolicy(_) => "Invalid Policy Configuration",
            Error::SchemaValidation(_) => "Schema Validation Failed",

            Error::Validation(_) => "Observation Validation Failed",
            Error::NegativeSpend { .. } => "Negative Spend Value",
            Error::NonFiniteSpend { .. } => "Non-Finite Spend Value",

            Error::Source(_) => "Data Source Error",
            Error::CampaignNotFound { .. } => "Campaign Not Found",
            Error::SourceDecode(_) => "Data Source Decode Error",

            Error::History(_) => "History Ledger Error",
            Error::HistoryCorrupted { .. } => "History Ledger Corrupted",

            Error::Render(_) => "Render Error",

            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
///
/// Used by machine-facing output modes for parseable error reporting.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for automated callers.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., campaign id, file path).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        // Add error-specific context
        match err {
            Error::NegativeSpend {
                campaign_id,
                field,
                value,
            } => {
                context.insert("campaign_id".to_string(), serde_json::json!(campaign_id));
                context.insert("field".to_string(), serde_json::json!(field));
                context.insert("value".to_string(), serde_json::json!(value));
            }
            Error::NonFiniteSpend { campaign_id, field } => {
                context.insert("campaign_id".to_string(), serde_json::json!(campaign_id));
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::CampaignNotFound { campaign_id } => {
                context.insert("campaign_id".to_string(), serde_json::json!(campaign_id));
            }
            Error::HistoryCorrupted { path, line } => {
                context.insert("path".to_string(), serde_json::json!(path));
                context.insert("line".to_string(), serde_json::json!(line));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

/// Result of a batch operation that may have partial success.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchResult<T> {
    /// Successfully completed items.
    pub succeeded: Vec<T>,

    /// Failed items with their errors.
    pub failed: Vec<BatchError>,

    /// Summary statistics.
    pub summary: BatchSummary,
}

/// A single error in a batch operation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchError {
    /// Identifier of the failed item (typically a campaign id).
    pub item_id: String,

    /// The structured error.
    pub error: StructuredError,
}

/// Summary of batch operation results.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchSummary {
    /// Total items attempted.
    pub total: usize,

    /// Number of successful items.
    pub succeeded: usize,

    /// Number of failed items.
    pub failed: usize,

    /// Whether all items succeeded.
    pub all_succeeded: bool,

    /// Whether any items succeeded.
    pub any_succeeded: bool,
}

impl<T> BatchResult<T> {
    /// Create a new batch result from succeeded and failed items.
    pub fn new(succeeded: Vec<T>, failed: Vec<BatchError>) -> Self {
        let total = succeeded.len() + failed.len();
        let succeeded_count = succeeded.len();
        let failed_count = failed.len();

        BatchResult {
            succeeded,
            failed,
            summary: BatchSummary {
                total,
                succeeded: succeeded_count,
                failed: failed_count,
                all_succeeded: failed_count == 0,
                any_succeeded: succeeded_count > 0,
            },
        }
    }

    /// Create a fully successful batch result.
    pub fn all_success(items: Vec<T>) -> Self {
        Self::new(items, Vec::new())
    }

    /// Add a failure to the batch result.
    pub fn add_failure(&mut self, item_id: impl Into<String>, error: &Error) {
        self.failed.push(BatchError {
            item_id: item_id.into(),
            error: StructuredError::from(error),
        });
        self.summary.failed += 1;
        self.summary.total += 1;
        self.summary.all_succeeded = false;
    }

    /// Add a success to the batch result.
    pub fn add_success(&mut self, item: T) {
        self.succeeded.push(item);
        self.summary.succeeded += 1;
        self.summary.total += 1;
        self.summary.any_succeeded = true;
    }
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

/// Format a batch result for human-readable stderr output.
pub fn format_batch_human<T: std::fmt::Display>(result: &BatchResult<T>, use_color: bool) -> String {
    let (green, red, reset) = if use_color {
        ("\x1b[32m", "\x1b[31m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    let mut output = String::new();

    // Summary line
    if result.summary.all_succeeded {
        output.push_str(&format!(
            "{green}✓{reset} All {} items completed successfully\n",
            result.summary.total,
            green = green,
            reset = reset
        ));
    } else if result.summary.any_succeeded {
        output.push_str(&format!(
            "Partial success: {} of {} items completed\n",
            result.summary.succeeded, result.summary.total
        ));
    } else {
        output.push_str(&format!(
            "{red}✗{reset} All {} items failed\n",
            result.summary.total,
            red = red,
            reset = reset
        ));
    }

    // List failures
    if !result.failed.is_empty() {
        output.push_str("\nErrors:\n");
        for batch_err in &result.failed {
            output.push_str(&format!(
                "  {red}✗{reset} {}: {}\n",
                batch_err.item_id,
                batch_err.error.message,
                red = red,
                reset = reset
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("test".into()).code(), 10);
        assert_eq!(
            Error::CampaignNotFound {
                campaign_id: "c1".into()
            }
            .code(),
            31
        );
        assert_eq!(
            Error::HistoryCorrupted {
                path: "anomalies.jsonl".into(),
                line: 7
            }
            .code(),
            41
        );
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::InvalidThresholds("test".into()).category(),
            ErrorCategory::Config
        );
        assert_eq!(
            Error::NegativeSpend {
                campaign_id: "c1".into(),
                field: "actual_spend".into(),
                value: -3.0
            }
            .category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            Error::Source("timeout".into()).category(),
            ErrorCategory::Source
        );
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::Config("test".into()).is_recoverable());
        assert!(Error::NegativeSpend {
            campaign_id: "c1".into(),
            field: "actual_spend".into(),
            value: -3.0
        }
        .is_recoverable());
        assert!(!Error::NonFiniteSpend {
            campaign_id: "c1".into(),
            field: "forecast_spend".into()
        }
        .is_recoverable());
        assert!(!Error::CampaignNotFound {
            campaign_id: "c1".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_suggested_action() {
        assert_eq!(
            Error::Source("timeout".into()).suggested_action(),
            SuggestedAction::Retry
        );
        assert_eq!(
            Error::CampaignNotFound {
                campaign_id: "c1".into()
            }
            .suggested_action(),
            SuggestedAction::Skip
        );
        assert_eq!(
            Error::InvalidThresholds("test".into()).suggested_action(),
            SuggestedAction::ResetConfig
        );
    }

    #[test]
    fn test_structured_error_from_error() {
        let err = Error::NegativeSpend {
            campaign_id: "camp-001".into(),
            field: "actual_spend".into(),
            value: -12.5,
        };
        let structured = StructuredError::from(&err);

        assert_eq!(structured.code, 21);
        assert_eq!(structured.category, ErrorCategory::Validation);
        assert!(structured.recoverable);
        assert_eq!(structured.suggested_action, SuggestedAction::Skip);
        assert_eq!(
            structured.context.get("campaign_id"),
            Some(&serde_json::json!("camp-001"))
        );
        assert_eq!(
            structured.context.get("value"),
            Some(&serde_json::json!(-12.5))
        );
    }

    #[test]
    fn test_structured_error_json() {
        let err = Error::CampaignNotFound {
            campaign_id: "camp-404".into(),
        };
        let structured = StructuredError::from(&err);
        let json = structured.to_json();

        assert!(json.contains(r#""code":31"#));
        assert!(json.contains(r#""category":"source""#));
        assert!(json.contains(r#""recoverable":false"#));
        assert!(json.contains(r#""suggested_action":"skip""#));
    }

    #[test]
    fn test_batch_result() {
        let mut batch: BatchResult<String> = BatchResult::default();

        batch.add_success("camp-001".to_string());
        batch.add_success("camp-002".to_string());
        batch.add_failure(
            "camp-003",
            &Error::CampaignNotFound {
                campaign_id: "camp-003".into(),
            },
        );

        assert_eq!(batch.summary.total, 3);
        assert_eq!(batch.summary.succeeded, 2);
        assert_eq!(batch.summary.failed, 1);
        assert!(!batch.summary.all_succeeded);
        assert!(batch.summary.any_succeeded);
    }

    #[test]
    fn test_format_error_human() {
        let err = Error::NonFiniteSpend {
            campaign_id: "camp-001".into(),
            field: "forecast_spend".into(),
        };
        let formatted = format_error_human(&err, false);

        assert!(formatted.contains("Non-Finite Spend Value"));
        assert!(formatted.contains("non-finite forecast_spend for campaign camp-001"));
        assert!(formatted.contains("Drop the row upstream"));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Config.to_string(), "config");
        assert_eq!(ErrorCategory::History.to_string(), "history");
    }

    #[test]
    fn test_suggested_action_display() {
        assert_eq!(SuggestedAction::Retry.to_string(), "retry");
        assert_eq!(SuggestedAction::ResetConfig.to_string(), "reset_config");
    }
}
