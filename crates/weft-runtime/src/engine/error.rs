//! Engine Layer Errors.
//!
//! All errors implement [`ErrorCode`] for standardized handling.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`EngineError::NotFound`] | `ENGINE_NOT_FOUND` | No |
//! | [`EngineError::ReservedAttribute`] | `ENGINE_RESERVED_ATTRIBUTE` | No |
//! | [`EngineError::ContractMismatch`] | `ENGINE_CONTRACT_MISMATCH` | No |
//! | [`EngineError::DirectionMismatch`] | `ENGINE_DIRECTION_MISMATCH` | No |
//! | [`EngineError::CardinalityExceeded`] | `ENGINE_CARDINALITY_EXCEEDED` | No |
//! | [`EngineError::Unbound`] | `ENGINE_UNBOUND` | No |
//! | [`EngineError::CycleDetected`] | `ENGINE_CYCLE_DETECTED` | No |
//! | [`EngineError::TransitionRejected`] | `ENGINE_TRANSITION_REJECTED` | No |
//! | [`EngineError::InvalidPlan`] | `ENGINE_INVALID_PLAN` | No |
//! | [`EngineError::InvalidPort`] | `ENGINE_INVALID_PORT` | No |
//! | [`EngineError::DuplicatePort`] | `ENGINE_DUPLICATE_PORT` | No |
//! | [`EngineError::DuplicateController`] | `ENGINE_DUPLICATE_CONTROLLER` | No |
//! | [`EngineError::Controller`] | `ENGINE_CONTROLLER` | No |
//! | [`EngineError::Unavailable`] | `ENGINE_UNAVAILABLE` | Yes |
//! | [`EngineError::Invocation`] | `ENGINE_INVOCATION` | as inner |
//!
//! # Recoverability
//!
//! - `Unavailable`: the provider may be started later
//! - `Invocation`: whatever the business error says
//!
//! Structural errors leave the graph unchanged and will fail the same
//! way on retry.

use thiserror::Error;
use weft_component::{AttributeError, ComponentError, Direction, LifecycleState, Transition};
use weft_controller::ControllerError;
use weft_types::{ComponentId, ErrorCode};

/// Engine layer error.
///
/// # Example
///
/// ```
/// use weft_runtime::EngineError;
/// use weft_types::ErrorCode;
///
/// let err = EngineError::Unbound { port: "db".into() };
/// assert_eq!(err.code(), "ENGINE_UNBOUND");
/// assert!(!err.is_recoverable());
/// ```
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A node or attribute does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Attempted to write or delete a system attribute.
    #[error("attribute '{key}' is reserved")]
    ReservedAttribute {
        /// Attribute key.
        key: String,
    },

    /// Provided contract does not satisfy the required one.
    #[error("contract mismatch: '{provided}' does not satisfy '{required}'")]
    ContractMismatch {
        /// Contract of the required port.
        required: String,
        /// Contract of the provided port.
        provided: String,
    },

    /// A port was used on the wrong side of a binding.
    #[error("port '{port}' must be {expected}")]
    DirectionMismatch {
        /// Port name.
        port: String,
        /// Direction the operation needed.
        expected: Direction,
    },

    /// A port is already at its maximum binding count.
    #[error("port '{port}' is at its maximum of {max} binding(s)")]
    CardinalityExceeded {
        /// Port name.
        port: String,
        /// Cardinality maximum.
        max: u32,
    },

    /// A required port has no binding to resolve.
    #[error("port '{port}' is unbound")]
    Unbound {
        /// Port name.
        port: String,
    },

    /// The edge would make the containment graph cyclic.
    #[error("attaching {child} under {parent} would create a cycle")]
    CycleDetected {
        /// Would-be parent.
        parent: ComponentId,
        /// Would-be child.
        child: ComponentId,
    },

    /// A lifecycle transition was illegal, failed a guard, or was vetoed.
    #[error("{transition} rejected for {component}: {reason}")]
    TransitionRejected {
        /// Component whose state did not change.
        component: ComponentId,
        /// Requested transition.
        transition: Transition,
        /// Guard message or veto reason.
        reason: String,
    },

    /// An instantiation plan failed validation.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// A port declaration is malformed.
    #[error("invalid port '{port}': {reason}")]
    InvalidPort {
        /// Port name.
        port: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A port name is already used on the component.
    #[error("{component} already has a port named '{name}'")]
    DuplicatePort {
        /// Owner.
        component: ComponentId,
        /// Port name.
        name: String,
    },

    /// A single-instance controller kind is already attached.
    #[error("{component} already has a '{kind}' controller")]
    DuplicateController {
        /// Owner.
        component: ComponentId,
        /// Controller kind.
        kind: String,
    },

    /// Building a controller from its declaration failed.
    #[error(transparent)]
    Controller(ControllerError),

    /// The provider is not STARTED.
    #[error("{component} is unavailable ({state})")]
    Unavailable {
        /// Provider component.
        component: ComponentId,
        /// Its current state.
        state: LifecycleState,
    },

    /// The business invocation failed.
    #[error("invocation failed: {0}")]
    Invocation(#[from] ComponentError),
}

impl EngineError {
    /// Shorthand for [`EngineError::NotFound`].
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub(crate) fn rejected(
        component: ComponentId,
        transition: Transition,
        reason: impl Into<String>,
    ) -> Self {
        Self::TransitionRejected {
            component,
            transition,
            reason: reason.into(),
        }
    }

    pub(crate) fn attribute(node: impl std::fmt::Display, err: AttributeError) -> Self {
        match err {
            AttributeError::NotFound { key } => {
                Self::NotFound(format!("attribute '{key}' on {node}"))
            }
            AttributeError::Reserved { key } => Self::ReservedAttribute { key },
        }
    }

    pub(crate) fn controller(component: ComponentId, err: ControllerError) -> Self {
        match err {
            ControllerError::DuplicateKind { kind } => Self::DuplicateController { component, kind },
            other => Self::Controller(other),
        }
    }
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ENGINE_NOT_FOUND",
            Self::ReservedAttribute { .. } => "ENGINE_RESERVED_ATTRIBUTE",
            Self::ContractMismatch { .. } => "ENGINE_CONTRACT_MISMATCH",
            Self::DirectionMismatch { .. } => "ENGINE_DIRECTION_MISMATCH",
            Self::CardinalityExceeded { .. } => "ENGINE_CARDINALITY_EXCEEDED",
            Self::Unbound { .. } => "ENGINE_UNBOUND",
            Self::CycleDetected { .. } => "ENGINE_CYCLE_DETECTED",
            Self::TransitionRejected { .. } => "ENGINE_TRANSITION_REJECTED",
            Self::InvalidPlan(_) => "ENGINE_INVALID_PLAN",
            Self::InvalidPort { .. } => "ENGINE_INVALID_PORT",
            Self::DuplicatePort { .. } => "ENGINE_DUPLICATE_PORT",
            Self::DuplicateController { .. } => "ENGINE_DUPLICATE_CONTROLLER",
            Self::Controller(_) => "ENGINE_CONTROLLER",
            Self::Unavailable { .. } => "ENGINE_UNAVAILABLE",
            Self::Invocation(_) => "ENGINE_INVOCATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Invocation(inner) => inner.is_recoverable(),
            _ => false,
        }
    }
}
