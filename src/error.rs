use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_EXECUTION_FAILED: &str = "W-ERR-EXEC-001";
pub const ERR_DESCRIPTOR_MISSING: &str = "W-ERR-DESC-001";
pub const ERR_INCOMPLETE_DESCRIPTOR: &str = "W-ERR-DESC-002";
pub const ERR_TIMED_OUT: &str = "W-ERR-EXEC-002";
pub const ERR_SANDBOX: &str = "W-ERR-SANDBOX-001";

pub const WARN_TRANSFORM_DEGRADED: &str = "W-WARN-TRANSFORM-001";
pub const WARN_FIELD_ADVISORY: &str = "W-WARN-FIELD-001";

// ═══════════════════════════════════════════════════════════════════════════════
// FAILURES
// ═══════════════════════════════════════════════════════════════════════════════

/// Terminal outcome of an extraction call. No descriptor is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExtractError {
    /// The module body threw, failed to compile, or hit an engine limit.
    #[error("failed to execute widget code: {message}")]
    ExecutionFailed { message: String },

    /// The module ran but none of the conventional export locations held an object.
    #[error("widget type definition not found in module exports")]
    DescriptorMissing,

    #[error("widget descriptor is missing required fields: {}", .missing.join(", "))]
    IncompleteDescriptor { missing: Vec<String> },

    #[error("widget execution did not finish within {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    /// The sandbox itself could not be set up or its worker died.
    #[error("widget sandbox failure: {message}")]
    Sandbox { message: String },
}

impl ExtractError {
    pub fn execution(message: impl Into<String>) -> Self {
        ExtractError::ExecutionFailed {
            message: message.into(),
        }
    }

    pub fn sandbox(message: impl Into<String>) -> Self {
        ExtractError::Sandbox {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExtractError::ExecutionFailed { .. } => ERR_EXECUTION_FAILED,
            ExtractError::DescriptorMissing => ERR_DESCRIPTOR_MISSING,
            ExtractError::IncompleteDescriptor { .. } => ERR_INCOMPLETE_DESCRIPTOR,
            ExtractError::TimedOut { .. } => ERR_TIMED_OUT,
            ExtractError::Sandbox { .. } => ERR_SANDBOX,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WARNINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Non-fatal notices collected along the way and returned next to the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExtractWarning {
    /// The JSX pass could not parse the module; the raw source was executed instead.
    TransformDegraded { message: String },
    /// A located descriptor has a field that does not look the way it should.
    FieldAdvisory { field: String, message: String },
}

impl ExtractWarning {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ExtractWarning::FieldAdvisory {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExtractWarning::TransformDegraded { .. } => WARN_TRANSFORM_DEGRADED,
            ExtractWarning::FieldAdvisory { .. } => WARN_FIELD_ADVISORY,
        }
    }
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractWarning::TransformDegraded { message } => {
                write!(f, "[{}] JSX transform skipped: {}", self.code(), message)
            }
            ExtractWarning::FieldAdvisory { field, message } => {
                write!(f, "[{}] field `{}`: {}", self.code(), field, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_serializes_with_kind_tag() {
        let err = ExtractError::execution("boom");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "kind": "execution-failed", "message": "boom" })
        );
        assert_eq!(
            serde_json::to_value(ExtractError::DescriptorMissing).unwrap(),
            json!({ "kind": "descriptor-missing" })
        );
    }

    #[test]
    fn test_incomplete_descriptor_message_lists_fields() {
        let err = ExtractError::IncompleteDescriptor {
            missing: vec!["title".to_string(), "icon".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "widget descriptor is missing required fields: title, icon"
        );
        assert_eq!(err.code(), ERR_INCOMPLETE_DESCRIPTOR);
    }

    #[test]
    fn test_warning_display_carries_code() {
        let warning = ExtractWarning::field("type", "bad suffix");
        assert_eq!(
            warning.to_string(),
            "[W-WARN-FIELD-001] field `type`: bad suffix"
        );
    }
}
