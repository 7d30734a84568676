//! Common error infrastructure for vitals-core.
//!
//! [`ModifyError`] is the only error a modification request can produce. It is
//! returned to the submitter and never leaves the attribute set in a partially
//! mutated state. [`InvariantViolation`] is a diagnostic record: the pipeline
//! logs it and repairs the value instead of failing the request.
//!
//! # Design Principles
//!
//! - **Atomic rejection**: a rejected request performs no mutation
//! - **Severity Classification**: errors are categorized for recovery strategies
//! - **Local propagation**: nothing unwinds past `AttributeSet::apply`

use crate::attribute::AttributeKind;

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: Temporary conditions that may succeed on retry
/// - **Validation**: Invalid input that should be rejected without retry
/// - **Internal**: Unexpected state inconsistencies that require investigation
/// - **Fatal**: Unrecoverable errors indicating corrupted state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all vitals-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait VitalsError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Stable across releases; used for log fields and test assertions.
    fn error_code(&self) -> &'static str;
}

/// Rejection of a modification request.
///
/// A request that fails with any of these variants has performed no mutation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifyError {
    /// The request names a stat the attribute set does not own.
    #[error("unknown attribute `{name}`")]
    UnknownAttribute { name: String },

    /// The magnitude (or the value it would produce) is not a finite number.
    #[error("invalid magnitude {magnitude} for {target}")]
    InvalidMagnitude {
        target: AttributeKind,
        magnitude: f64,
    },
}

impl ModifyError {
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownAttribute { name: name.into() }
    }

    pub const fn invalid_magnitude(target: AttributeKind, magnitude: f64) -> Self {
        Self::InvalidMagnitude { target, magnitude }
    }
}

impl VitalsError for ModifyError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownAttribute { .. } => "UNKNOWN_ATTRIBUTE",
            Self::InvalidMagnitude { .. } => "INVALID_MAGNITUDE",
        }
    }
}

/// An attribute found outside its valid range after commit.
///
/// Unreachable while the clamp rules hold. When observed, the pipeline logs it
/// and commits `corrected` in place of `found`.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("invariant violation on {attribute}: found {found}, corrected to {corrected}")]
pub struct InvariantViolation {
    pub attribute: AttributeKind,
    pub found: f64,
    pub corrected: f64,
}

impl VitalsError for InvariantViolation {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        "INVARIANT_VIOLATION_DETECTED"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_errors_are_validation_errors() {
        let unknown = ModifyError::unknown("armor");
        let invalid = ModifyError::invalid_magnitude(AttributeKind::Health, f64::NAN);

        assert_eq!(unknown.severity(), ErrorSeverity::Validation);
        assert_eq!(unknown.error_code(), "UNKNOWN_ATTRIBUTE");
        assert_eq!(invalid.error_code(), "INVALID_MAGNITUDE");
        assert!(!invalid.severity().is_recoverable());
    }

    #[test]
    fn invariant_violation_is_internal() {
        let violation = InvariantViolation {
            attribute: AttributeKind::Mana,
            found: -3.0,
            corrected: 0.0,
        };
        assert!(violation.severity().is_internal());
        assert_eq!(
            violation.to_string(),
            "invariant violation on mana: found -3, corrected to 0"
        );
    }
}
