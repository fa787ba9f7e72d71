//! `access`: allow/deny lists over operation names.

use crate::{Controller, ControllerError, ControllerSpec, InterceptAction};
use std::collections::BTreeSet;
use weft_component::{ComponentError, Invocation};

/// Rejects invocations by operation name.
///
/// An operation is allowed when it is not in `deny` and, if an `allow`
/// list is configured, is in it.
///
/// ```toml
/// [[controllers]]
/// kind = "access"
/// config = { allow = ["get", "list"], deny = ["drop"] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AccessController {
    allow: Option<BTreeSet<String>>,
    deny: BTreeSet<String>,
}

impl AccessController {
    /// Creates a controller that allows everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to the given operations.
    #[must_use]
    pub fn allow<I, S>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = Some(ops.into_iter().map(Into::into).collect());
        self
    }

    /// Denies the given operations.
    #[must_use]
    pub fn deny<I, S>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny.extend(ops.into_iter().map(Into::into));
        self
    }

    /// Builds from a spec. Config: `allow`, `deny` (lists of strings).
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidConfig`] if a list field is not an array.
    pub fn from_spec(spec: &ControllerSpec) -> Result<Self, ControllerError> {
        let mut controller = Self::new();
        for field in ["allow", "deny"] {
            if spec.config.get(field).is_some_and(|v| !v.is_array()) {
                return Err(ControllerError::InvalidConfig {
                    kind: spec.kind.clone(),
                    reason: format!("{field} must be a list of operation names"),
                });
            }
        }
        if let Some(allow) = spec.config_strings("allow") {
            controller = controller.allow(allow);
        }
        if let Some(deny) = spec.config_strings("deny") {
            controller = controller.deny(deny);
        }
        Ok(controller)
    }

    /// Returns `true` if `operation` may pass.
    #[must_use]
    pub fn permits(&self, operation: &str) -> bool {
        !self.deny.contains(operation)
            && self
                .allow
                .as_ref()
                .map_or(true, |allow| allow.contains(operation))
    }
}

impl Controller for AccessController {
    fn kind(&self) -> &str {
        "access"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn intercept(&self, invocation: &mut Invocation) -> InterceptAction {
        if self.permits(&invocation.operation) {
            InterceptAction::Continue
        } else {
            tracing::info!(
                callee = %invocation.callee,
                operation = %invocation.operation,
                "invocation denied"
            );
            InterceptAction::Fail(ComponentError::Denied(format!(
                "operation '{}' is not permitted",
                invocation.operation
            )))
        }
    }
}
