//! `degradation`: reacts to callers with unsatisfied required ports.
//!
//! The engine only flags degradation; what to do about it is policy.

use crate::{Controller, ControllerError, ControllerSpec, InterceptAction};
use weft_component::{ComponentError, Invocation};

/// What to do with calls from a degraded component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegradationMode {
    /// Log and let the call through.
    #[default]
    Warn,
    /// Fail the call with [`ComponentError::Degraded`].
    Reject,
}

/// Applies a [`DegradationMode`] to invocations from degraded callers.
#[derive(Debug, Clone, Default)]
pub struct DegradationController {
    mode: DegradationMode,
}

impl DegradationController {
    /// Creates a controller with the given mode.
    #[must_use]
    pub fn new(mode: DegradationMode) -> Self {
        Self { mode }
    }

    /// Builds from a spec. Config: `mode` = `"warn"` | `"reject"`.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidConfig`] for any other mode.
    pub fn from_spec(spec: &ControllerSpec) -> Result<Self, ControllerError> {
        let mode = match spec.config_str("mode") {
            None | Some("warn") => DegradationMode::Warn,
            Some("reject") => DegradationMode::Reject,
            Some(other) => {
                return Err(ControllerError::InvalidConfig {
                    kind: spec.kind.clone(),
                    reason: format!("unknown mode '{other}' (expected warn or reject)"),
                })
            }
        };
        Ok(Self::new(mode))
    }

    /// Configured mode.
    #[must_use]
    pub fn mode(&self) -> DegradationMode {
        self.mode
    }
}

impl Controller for DegradationController {
    fn kind(&self) -> &str {
        "degradation"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn intercept(&self, invocation: &mut Invocation) -> InterceptAction {
        if !invocation.caller_degraded {
            return InterceptAction::Continue;
        }
        let caller = invocation
            .caller
            .map_or_else(|| "<direct>".to_string(), |c| c.to_string());
        match self.mode {
            DegradationMode::Warn => {
                tracing::warn!(caller = %caller, operation = %invocation.operation, "call from degraded component");
                InterceptAction::Continue
            }
            DegradationMode::Reject => InterceptAction::Fail(ComponentError::Degraded(caller)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_types::{ComponentId, PortId};

    fn degraded_inv() -> Invocation {
        let mut inv = Invocation::direct(ComponentId::new(), PortId::new(), "op", json!(null));
        inv.caller = Some(ComponentId::new());
        inv.caller_degraded = true;
        inv
    }

    #[test]
    fn warn_mode_continues() {
        let ctl = DegradationController::default();
        assert!(ctl.intercept(&mut degraded_inv()).is_continue());
    }

    #[test]
    fn reject_mode_fails_degraded_callers_only() {
        let ctl = DegradationController::new(DegradationMode::Reject);
        assert!(matches!(
            ctl.intercept(&mut degraded_inv()),
            InterceptAction::Fail(ComponentError::Degraded(_))
        ));
        let mut healthy = degraded_inv();
        healthy.caller_degraded = false;
        assert!(ctl.intercept(&mut healthy).is_continue());
    }

    #[test]
    fn from_spec_modes() {
        let spec = ControllerSpec::new("degradation").with_config(json!({"mode": "reject"}));
        assert_eq!(
            DegradationController::from_spec(&spec).unwrap().mode(),
            DegradationMode::Reject
        );
        let bad = ControllerSpec::new("degradation").with_config(json!({"mode": "panic"}));
        assert!(DegradationController::from_spec(&bad).is_err());
    }
}
