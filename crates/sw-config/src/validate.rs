//! Configuration validation errors and semantic validation.

use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SchemaError(_) => 62,
            ValidationError::SemanticError(_) => 63,
            ValidationError::MissingField(_) => 64,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate a threshold set semantically.
///
/// The classifier itself never validates ordering; this is the single
/// gate where a misordered or non-finite cascade is caught before it
/// reaches classification.
pub fn validate_thresholds(thresholds: &crate::thresholds::ThresholdSet) -> ValidationResult<()> {
    // Check schema version
    if thresholds.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: thresholds.schema_version.clone(),
        });
    }

    let tiers = [
        ("thresholds.l1", thresholds.l1),
        ("thresholds.l2", thresholds.l2),
        ("thresholds.l3", thresholds.l3),
    ];

    for (field, value) in tiers {
        if !value.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!("Must be finite, got {}", value),
            });
        }
        if value < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!("Must be non-negative, got {}", value),
            });
        }
    }

    // Strictly ascending: equal tiers would make the lower one unreachable.
    if thresholds.l1 >= thresholds.l2 || thresholds.l2 >= thresholds.l3 {
        return Err(ValidationError::SemanticError(format!(
            "Thresholds must be strictly ascending (l1 < l2 < l3), got l1={}, l2={}, l3={}",
            thresholds.l1, thresholds.l2, thresholds.l3,
        )));
    }

    Ok(())
}

/// Validate a detection policy semantically.
pub fn validate_policy(policy: &crate::policy::DetectionPolicy) -> ValidationResult<()> {
    // Check schema version
    if policy.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: policy.schema_version.clone(),
        });
    }

    if policy.retention_days == 0 {
        return Err(ValidationError::InvalidValue {
            field: "retention_days".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }

    Ok(())
}
