//! Error types for controllers and membranes.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weft_types::ErrorCode;

/// Errors raised while assembling a membrane.
///
/// | Error | Code | Recoverable |
/// |-------|------|-------------|
/// | [`DuplicateKind`](ControllerError::DuplicateKind) | `CONTROLLER_DUPLICATE_KIND` | No |
/// | [`UnknownKind`](ControllerError::UnknownKind) | `CONTROLLER_UNKNOWN_KIND` | No |
/// | [`InvalidConfig`](ControllerError::InvalidConfig) | `CONTROLLER_INVALID_CONFIG` | No |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ControllerError {
    /// A single-instance controller of this kind is already attached.
    #[error("controller kind already attached: {kind}")]
    DuplicateKind {
        /// Controller kind.
        kind: String,
    },

    /// No builder is registered for this kind.
    #[error("unknown controller kind: {kind}")]
    UnknownKind {
        /// Controller kind.
        kind: String,
    },

    /// The controller's configuration is malformed.
    #[error("controller '{kind}': {reason}")]
    InvalidConfig {
        /// Controller kind.
        kind: String,
        /// What is wrong.
        reason: String,
    },
}

impl ErrorCode for ControllerError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateKind { .. } => "CONTROLLER_DUPLICATE_KIND",
            Self::UnknownKind { .. } => "CONTROLLER_UNKNOWN_KIND",
            Self::InvalidConfig { .. } => "CONTROLLER_INVALID_CONFIG",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                ControllerError::DuplicateKind { kind: "x".into() },
                ControllerError::UnknownKind { kind: "x".into() },
                ControllerError::InvalidConfig {
                    kind: "x".into(),
                    reason: "y".into(),
                },
            ],
            "CONTROLLER_",
        );
    }

    #[test]
    fn display_invalid_config() {
        let err = ControllerError::InvalidConfig {
            kind: "deadline".into(),
            reason: "limit_ms must be a positive integer".into(),
        };
        assert_eq!(
            err.to_string(),
            "controller 'deadline': limit_ms must be a positive integer"
        );
    }
}
