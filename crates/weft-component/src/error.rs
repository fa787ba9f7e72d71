//! Business invocation errors.
//!
//! Returned by payloads, remote adapters and invocation interceptors.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`NotSupported`](ComponentError::NotSupported) | `COMPONENT_NOT_SUPPORTED` | No |
//! | [`ExecutionFailed`](ComponentError::ExecutionFailed) | `COMPONENT_EXECUTION_FAILED` | Yes |
//! | [`InvalidPayload`](ComponentError::InvalidPayload) | `COMPONENT_INVALID_PAYLOAD` | No |
//! | [`Aborted`](ComponentError::Aborted) | `COMPONENT_ABORTED` | No |
//! | [`Denied`](ComponentError::Denied) | `COMPONENT_DENIED` | No |
//! | [`Degraded`](ComponentError::Degraded) | `COMPONENT_DEGRADED` | Yes |
//! | [`DeadlineExceeded`](ComponentError::DeadlineExceeded) | `COMPONENT_DEADLINE_EXCEEDED` | Yes |
//!
//! # Example
//!
//! ```
//! use weft_component::ComponentError;
//! use weft_types::ErrorCode;
//!
//! let err = ComponentError::Denied("caller not allowed".into());
//! assert_eq!(err.code(), "COMPONENT_DENIED");
//! assert!(!err.is_recoverable());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weft_types::ErrorCode;

/// Business invocation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ComponentError {
    /// The payload does not implement the requested operation.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// The operation ran and failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Arguments don't match what the operation expects.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// An interceptor aborted the call without a reason.
    #[error("invocation aborted")]
    Aborted,

    /// An access interceptor refused the call.
    #[error("access denied: {0}")]
    Denied(String),

    /// The caller has unsatisfied required ports.
    #[error("component degraded: {0}")]
    Degraded(String),

    /// The call ran longer than its deadline.
    #[error("deadline exceeded: {elapsed_ms}ms > {limit_ms}ms")]
    DeadlineExceeded {
        /// Configured limit.
        limit_ms: u64,
        /// Observed duration.
        elapsed_ms: u64,
    },
}

impl ErrorCode for ComponentError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotSupported(_) => "COMPONENT_NOT_SUPPORTED",
            Self::ExecutionFailed(_) => "COMPONENT_EXECUTION_FAILED",
            Self::InvalidPayload(_) => "COMPONENT_INVALID_PAYLOAD",
            Self::Aborted => "COMPONENT_ABORTED",
            Self::Denied(_) => "COMPONENT_DENIED",
            Self::Degraded(_) => "COMPONENT_DEGRADED",
            Self::DeadlineExceeded { .. } => "COMPONENT_DEADLINE_EXCEEDED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::ExecutionFailed(_) | Self::Degraded(_) | Self::DeadlineExceeded { .. } => true,
            Self::NotSupported(_) | Self::InvalidPayload(_) | Self::Aborted | Self::Denied(_) => {
                false
            }
        }
    }
}
