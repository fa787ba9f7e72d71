//! What a controller tells the membrane to do next.
//!
//! `Default` is not implemented for either type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_component::ComponentError;

/// Verdict of a `before` hook on a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerAction {
    /// Let the transition proceed.
    Approve,
    /// Reject the transition; the state stays unchanged.
    Veto {
        /// Why the transition was rejected.
        reason: String,
    },
}

impl ControllerAction {
    /// Shorthand for [`Veto`](Self::Veto).
    #[must_use]
    pub fn veto(reason: impl Into<String>) -> Self {
        Self::Veto {
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`Approve`](Self::Approve).
    #[must_use]
    pub fn is_approve(&self) -> bool {
        matches!(self, Self::Approve)
    }

    /// Returns `true` for [`Veto`](Self::Veto).
    #[must_use]
    pub fn is_veto(&self) -> bool {
        matches!(self, Self::Veto { .. })
    }
}

/// Verdict of an `intercept` hook on a business invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InterceptAction {
    /// Pass the (possibly modified) invocation to the next interceptor.
    Continue,
    /// Short-circuit with a result; later interceptors and the payload
    /// are not called.
    Respond(Value),
    /// Short-circuit with an error.
    Fail(ComponentError),
}

impl InterceptAction {
    /// Returns `true` for [`Continue`](Self::Continue).
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Returns `true` if the chain stops here.
    #[must_use]
    pub fn is_short_circuit(&self) -> bool {
        !self.is_continue()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn veto_shorthand() {
        let action = ControllerAction::veto("maintenance window");
        assert!(action.is_veto());
        assert!(!action.is_approve());
        assert_eq!(
            action,
            ControllerAction::Veto {
                reason: "maintenance window".into()
            }
        );
    }

    #[test]
    fn intercept_predicates() {
        assert!(InterceptAction::Continue.is_continue());
        assert!(InterceptAction::Respond(json!(1)).is_short_circuit());
        assert!(InterceptAction::Fail(ComponentError::Aborted).is_short_circuit());
    }
}
