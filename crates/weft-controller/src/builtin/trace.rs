//! `trace`: logs every transition and invocation crossing a membrane.

use crate::{
    Controller, ControllerAction, ControllerError, ControllerSpec, InterceptAction,
    TransitionContext, TransitionOutcome,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use weft_component::{ComponentError, Invocation};
use weft_types::ComponentId;

const DEFAULT_CAPACITY: usize = 256;

/// One traced event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Component the event concerns.
    pub component: ComponentId,
    /// Short description, e.g. `"start:committed"` or `"get:ok"`.
    pub event: String,
}

/// Emits `tracing` events and keeps the most recent ones in memory.
///
/// Runs at priority 0 so it wraps every other controller.
pub struct TraceController {
    capacity: usize,
    entries: Mutex<VecDeque<TraceEntry>>,
}

impl TraceController {
    /// Creates a tracer keeping up to `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
        }
    }

    /// Builds from a spec. Config: `capacity` (default 256).
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidConfig`] if `capacity` is zero.
    pub fn from_spec(spec: &ControllerSpec) -> Result<Self, ControllerError> {
        let capacity = match spec.config_u64("capacity") {
            Some(0) => {
                return Err(ControllerError::InvalidConfig {
                    kind: spec.kind.clone(),
                    reason: "capacity must be positive".into(),
                })
            }
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
            None => DEFAULT_CAPACITY,
        };
        Ok(Self::new(capacity))
    }

    /// Recorded entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    fn record(&self, component: ComponentId, event: String) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(TraceEntry { component, event });
    }
}

impl Default for TraceController {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Controller for TraceController {
    fn kind(&self) -> &str {
        "trace"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn before(&self, ctx: &TransitionContext) -> ControllerAction {
        tracing::debug!(
            component = %ctx.component,
            name = %ctx.name,
            from = %ctx.from,
            to = %ctx.to,
            "transition requested"
        );
        ControllerAction::Approve
    }

    fn after(&self, ctx: &TransitionContext, outcome: &TransitionOutcome) {
        tracing::info!(
            component = %ctx.component,
            name = %ctx.name,
            transition = %ctx.transition,
            outcome = %outcome,
            "transition finished"
        );
        let tag = if outcome.is_committed() { "committed" } else { "rejected" };
        self.record(ctx.component, format!("{}:{tag}", ctx.transition));
    }

    fn intercept(&self, invocation: &mut Invocation) -> InterceptAction {
        tracing::debug!(
            callee = %invocation.callee,
            operation = %invocation.operation,
            kind = %invocation.kind,
            "invocation entering"
        );
        InterceptAction::Continue
    }

    fn complete(
        &self,
        invocation: &Invocation,
        result: Result<Value, ComponentError>,
    ) -> Result<Value, ComponentError> {
        let tag = match &result {
            Ok(_) => "ok".to_string(),
            Err(e) => {
                tracing::debug!(operation = %invocation.operation, error = %e, "invocation failed");
                "err".to_string()
            }
        };
        self.record(invocation.callee, format!("{}:{tag}", invocation.operation));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_component::{LifecycleState, Transition};
    use weft_types::PortId;

    #[test]
    fn records_transitions_and_invocations() {
        let tracer = TraceController::default();
        let id = ComponentId::new();
        let ctx = TransitionContext::new(
            id,
            "svc",
            Transition::Start,
            LifecycleState::Configured,
            LifecycleState::Started,
        );
        assert!(tracer.before(&ctx).is_approve());
        tracer.after(&ctx, &TransitionOutcome::Committed);

        let inv = Invocation::direct(id, PortId::new(), "get", json!(null));
        tracer
            .complete(&inv, Err(ComponentError::Aborted))
            .unwrap_err();

        let events: Vec<_> = tracer.entries().into_iter().map(|e| e.event).collect();
        assert_eq!(events, vec!["start:committed", "get:err"]);
    }

    #[test]
    fn ring_drops_oldest() {
        let tracer = TraceController::new(2);
        let inv = Invocation::direct(ComponentId::new(), PortId::new(), "op", json!(null));
        for _ in 0..3 {
            tracer.complete(&inv, Ok(json!(1))).unwrap();
        }
        assert_eq!(tracer.entries().len(), 2);
    }

    #[test]
    fn from_spec_capacity() {
        let spec = ControllerSpec::new("trace").with_config(json!({"capacity": 0}));
        assert!(TraceController::from_spec(&spec).is_err());
        let spec = ControllerSpec::new("trace").with_config(json!({"capacity": 8}));
        assert_eq!(TraceController::from_spec(&spec).unwrap().capacity, 8);
    }
}
