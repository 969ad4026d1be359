//! Exit codes for the sw-core CLI.
//!
//! Exit codes communicate detection outcome without requiring output parsing:
//! a cron wrapper can distinguish "clean window" from "anomalies found" from
//! the code alone.
//!
//! Exit code ranges:
//! - 0-2: Operational outcomes (parse outcome from code, not output)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

/// Exit codes for sw-core operations.
///
/// These codes are a stable contract for automation. Changes require
/// a major version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-2)
    // ========================================================================
    /// Success: run completed, no anomalies in the window
    Clean = 0,

    /// Run completed and at least one anomaly was classified
    AnomaliesFound = 1,

    /// Run completed for some campaigns but one or more sources failed
    PartialSourceFail = 2,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments or unloadable configuration
    ArgsError = 10,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates operational outcome (codes 0-2).
    /// These are not errors - they communicate detection state.
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    /// These can be resolved by user action.
    pub fn is_user_error(self) -> bool {
        let code = self as i32;
        (10..20).contains(&code)
    }

    /// Check if this exit code is an internal error (codes 20-29).
    /// These indicate bugs and should be reported.
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::AnomaliesFound => "OK_ANOMALIES",
            ExitCode::PartialSourceFail => "ERR_PARTIAL_SOURCE",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
