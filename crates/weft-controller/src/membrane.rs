//! Membrane: the ordered controller chain of one component.
//!
//! The engine keeps each membrane behind the owning component's lock
//! and takes a [`Chain`] snapshot before dispatching, so hooks never run
//! while that lock is held.

use crate::{
    Controller, ControllerAction, ControllerError, InterceptAction, TransitionContext,
    TransitionOutcome,
};
use serde_json::{json, Value};
use std::sync::Arc;
use weft_component::{Attributes, ComponentError, Invocation, Reflective};
use weft_types::{ControllerId, NodeKey};

/// A controller attached to a membrane, with its reflective state.
pub struct ControllerSlot {
    id: ControllerId,
    controller: Arc<dyn Controller>,
    priority: i32,
    enabled: bool,
    attributes: Attributes,
}

impl ControllerSlot {
    fn new(controller: Arc<dyn Controller>, priority: i32) -> Self {
        let id = ControllerId::new();
        let mut attributes = Attributes::new();
        attributes.set_system("id", json!(id.to_string()));
        attributes.set_system("kind", json!(controller.kind()));
        attributes.set_system("priority", json!(priority));
        attributes.set_system("multi_instance", json!(controller.multi_instance()));
        attributes.set_system("enabled", json!(true));
        Self {
            id,
            controller,
            priority,
            enabled: true,
            attributes,
        }
    }

    /// Slot id.
    #[must_use]
    pub fn id(&self) -> ControllerId {
        self.id
    }

    /// Controller kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.controller.kind()
    }

    /// Effective priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether the slot takes part in dispatch.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The controller.
    #[must_use]
    pub fn controller(&self) -> &Arc<dyn Controller> {
        &self.controller
    }
}

impl std::fmt::Debug for ControllerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerSlot")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Reflective for ControllerSlot {
    fn node_key(&self) -> NodeKey {
        self.id.into()
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

/// Ordered set of controllers attached to one component.
///
/// Slots are kept sorted by priority (ascending), FIFO for equal
/// priorities.
#[derive(Debug, Default)]
pub struct Membrane {
    slots: Vec<ControllerSlot>,
}

impl Membrane {
    /// Creates an empty membrane.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a controller at its own priority.
    ///
    /// # Errors
    ///
    /// [`ControllerError::DuplicateKind`] if a controller of the same kind
    /// is attached and either of them is single-instance.
    pub fn attach(&mut self, controller: Arc<dyn Controller>) -> Result<ControllerId, ControllerError> {
        let priority = controller.priority();
        self.attach_with_priority(controller, priority)
    }

    /// Attaches a controller at an explicit priority.
    ///
    /// # Errors
    ///
    /// See [`attach`](Self::attach).
    pub fn attach_with_priority(
        &mut self,
        controller: Arc<dyn Controller>,
        priority: i32,
    ) -> Result<ControllerId, ControllerError> {
        let kind = controller.kind().to_string();
        let clash = self.slots.iter().any(|s| {
            s.kind() == kind && !(s.controller.multi_instance() && controller.multi_instance())
        });
        if clash {
            return Err(ControllerError::DuplicateKind { kind });
        }

        let slot = ControllerSlot::new(controller, priority);
        let id = slot.id;

        // Stable insert: after every slot with priority <= ours.
        let pos = self
            .slots
            .iter()
            .position(|s| s.priority > priority)
            .unwrap_or(self.slots.len());
        self.slots.insert(pos, slot);

        tracing::debug!(controller = %id, kind = %kind, priority, "controller attached");
        Ok(id)
    }

    /// Detaches a controller, returning it.
    pub fn detach(&mut self, id: ControllerId) -> Option<Arc<dyn Controller>> {
        let pos = self.slots.iter().position(|s| s.id == id)?;
        let slot = self.slots.remove(pos);
        tracing::debug!(controller = %id, kind = %slot.kind(), "controller detached");
        Some(slot.controller)
    }

    /// Enables or disables a controller. Returns `false` if not attached.
    pub fn set_enabled(&mut self, id: ControllerId, enabled: bool) -> bool {
        match self.slots.iter_mut().find(|s| s.id == id) {
            Some(slot) => {
                slot.enabled = enabled;
                slot.attributes.set_system("enabled", Value::Bool(enabled));
                true
            }
            None => false,
        }
    }

    /// Looks up a slot.
    #[must_use]
    pub fn get(&self, id: ControllerId) -> Option<&ControllerSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Looks up a slot mutably.
    pub fn get_mut(&mut self, id: ControllerId) -> Option<&mut ControllerSlot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }

    /// First slot of the given kind.
    #[must_use]
    pub fn by_kind(&self, kind: &str) -> Option<&ControllerSlot> {
        self.slots.iter().find(|s| s.kind() == kind)
    }

    /// Slot ids in dispatch order.
    #[must_use]
    pub fn ids(&self) -> Vec<ControllerId> {
        self.slots.iter().map(|s| s.id).collect()
    }

    /// Slot kinds in dispatch order.
    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.kind().to_string()).collect()
    }

    /// Number of attached controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Detaches everything.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Snapshot of the enabled controllers in dispatch order.
    #[must_use]
    pub fn chain(&self) -> Chain {
        Chain {
            links: self
                .slots
                .iter()
                .filter(|s| s.enabled)
                .map(|s| (s.id, Arc::clone(&s.controller)))
                .collect(),
        }
    }
}

/// An ordered, lock-free snapshot of controllers ready for dispatch.
#[derive(Clone, Default)]
pub struct Chain {
    links: Vec<(ControllerId, Arc<dyn Controller>)>,
}

impl Chain {
    /// Appends `other` after `self`.
    ///
    /// Used for invocations, which cross the caller's membrane and then
    /// the provider's.
    #[must_use]
    pub fn then(mut self, other: Chain) -> Chain {
        self.links.extend(other.links);
        self
    }

    /// Number of controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Runs a lifecycle transition through the chain.
    ///
    /// `before` hooks run in order; the first veto stops them. If none
    /// vetoed, `commit` is called. `after` hooks then run in reverse over
    /// every controller whose `before` ran, whatever the outcome.
    pub fn run_transition<F>(&self, ctx: &TransitionContext, commit: F) -> TransitionOutcome
    where
        F: FnOnce() -> Result<(), String>,
    {
        let mut ran = 0;
        let mut vetoed = None;

        for (id, controller) in &self.links {
            ran += 1;
            if let ControllerAction::Veto { reason } = controller.before(ctx) {
                tracing::info!(
                    component = %ctx.component,
                    controller = %id,
                    kind = controller.kind(),
                    transition = %ctx.transition,
                    reason = %reason,
                    "transition vetoed"
                );
                vetoed = Some(TransitionOutcome::Vetoed {
                    controller: controller.kind().to_string(),
                    reason,
                });
                break;
            }
        }

        let outcome = match vetoed {
            Some(outcome) => outcome,
            None => match commit() {
                Ok(()) => TransitionOutcome::Committed,
                Err(reason) => TransitionOutcome::Failed { reason },
            },
        };

        for (_, controller) in self.links[..ran].iter().rev() {
            controller.after(ctx, &outcome);
        }

        outcome
    }

    /// Runs a business invocation through the chain.
    ///
    /// `intercept` hooks run in order and may rewrite the invocation or
    /// short-circuit. If none did, `terminal` produces the result.
    /// `complete` hooks then run in reverse over every controller whose
    /// `intercept` ran, each seeing the previous result.
    pub fn run_invocation<F>(&self, mut invocation: Invocation, terminal: F) -> Result<Value, ComponentError>
    where
        F: FnOnce(&Invocation) -> Result<Value, ComponentError>,
    {
        let mut entered = 0;
        let mut short = None;

        for (id, controller) in &self.links {
            entered += 1;
            match controller.intercept(&mut invocation) {
                InterceptAction::Continue => {}
                InterceptAction::Respond(value) => {
                    tracing::debug!(controller = %id, operation = %invocation.operation, "invocation answered by controller");
                    short = Some(Ok(value));
                    break;
                }
                InterceptAction::Fail(err) => {
                    tracing::debug!(controller = %id, operation = %invocation.operation, error = %err, "invocation failed by controller");
                    short = Some(Err(err));
                    break;
                }
            }
        }

        let mut result = match short {
            Some(result) => result,
            None => terminal(&invocation),
        };

        for (_, controller) in self.links[..entered].iter().rev() {
            result = controller.complete(&invocation, result);
        }

        result
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.links.iter().map(|(id, c)| (id, c.kind().to_string())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{CallLog, MockController};
    use weft_component::{LifecycleState, Transition};
    use weft_types::{ComponentId, PortId};

    fn ctx(t: Transition) -> TransitionContext {
        TransitionContext::new(
            ComponentId::new(),
            "svc",
            t,
            LifecycleState::Configured,
            LifecycleState::Started,
        )
    }

    fn inv(op: &str) -> Invocation {
        Invocation::direct(ComponentId::new(), PortId::new(), op, json!([]))
    }

    fn mock(kind: &str, priority: i32, log: &CallLog) -> Arc<dyn Controller> {
        Arc::new(MockController::new(kind).with_priority(priority).with_log(log))
    }

    // ── Attach / ordering ────────────────────────────────────

    #[test]
    fn ordered_by_priority_fifo_on_ties() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        m.attach(mock("c", 100, &log)).unwrap();
        m.attach(mock("a", 10, &log)).unwrap();
        m.attach(mock("d", 100, &log)).unwrap();
        m.attach(mock("b", 50, &log)).unwrap();
        assert_eq!(m.kinds(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn explicit_priority_overrides_controller_default() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        m.attach(mock("late", 100, &log)).unwrap();
        m.attach_with_priority(mock("early", 100, &log), 1).unwrap();
        assert_eq!(m.kinds(), vec!["early", "late"]);
        let id = m.ids()[0];
        assert_eq!(m.get(id).unwrap().get("priority").unwrap(), &json!(1));
    }

    #[test]
    fn duplicate_kind_rejected() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        m.attach(mock("trace", 100, &log)).unwrap();
        let err = m.attach(mock("trace", 1, &log)).unwrap_err();
        assert_eq!(err, ControllerError::DuplicateKind { kind: "trace".into() });
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn multi_instance_allowed() {
        let mut m = Membrane::new();
        m.attach(Arc::new(MockController::new("probe").multi())).unwrap();
        m.attach(Arc::new(MockController::new("probe").multi())).unwrap();
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn detach_and_lookup() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        let id = m.attach(mock("x", 100, &log)).unwrap();
        assert!(m.by_kind("x").is_some());
        assert!(m.detach(id).is_some());
        assert!(m.detach(id).is_none());
        assert!(m.is_empty());
    }

    #[test]
    fn slot_system_attributes_reserved() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        let id = m.attach(mock("x", 100, &log)).unwrap();
        let slot = m.get_mut(id).unwrap();
        assert!(slot.set("kind", json!("y")).is_err());
        slot.set("note", json!("ok")).unwrap();
        assert_eq!(slot.keys(), vec!["enabled", "id", "kind", "multi_instance", "note", "priority"]);
    }

    // ── Transitions ──────────────────────────────────────────

    #[test]
    fn before_ascending_after_descending() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        m.attach(mock("b", 20, &log)).unwrap();
        m.attach(mock("a", 10, &log)).unwrap();

        let outcome = m.chain().run_transition(&ctx(Transition::Start), || Ok(()));
        assert!(outcome.is_committed());
        assert_eq!(
            log.entries(),
            vec![
                "a:before:start",
                "b:before:start",
                "b:after:start:committed",
                "a:after:start:committed",
            ]
        );
    }

    #[test]
    fn veto_unwinds_only_ran_controllers() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        m.attach(mock("a", 10, &log)).unwrap();
        m.attach(Arc::new(
            MockController::new("guard")
                .with_priority(20)
                .with_log(&log)
                .vetoing(Transition::Start, "not yet"),
        ))
        .unwrap();
        m.attach(mock("c", 30, &log)).unwrap();

        let mut committed = false;
        let outcome = m.chain().run_transition(&ctx(Transition::Start), || {
            committed = true;
            Ok(())
        });

        assert!(!committed);
        assert_eq!(
            outcome,
            TransitionOutcome::Vetoed {
                controller: "guard".into(),
                reason: "not yet".into()
            }
        );
        assert_eq!(
            log.entries(),
            vec![
                "a:before:start",
                "guard:before:start",
                "guard:after:start:vetoed",
                "a:after:start:vetoed",
            ]
        );
    }

    #[test]
    fn commit_failure_reported_to_after() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        m.attach(mock("a", 10, &log)).unwrap();
        let outcome = m
            .chain()
            .run_transition(&ctx(Transition::Start), || Err("port unbound".into()));
        assert_eq!(
            outcome,
            TransitionOutcome::Failed {
                reason: "port unbound".into()
            }
        );
        assert_eq!(log.matching("after"), vec!["a:after:start:failed"]);
    }

    #[test]
    fn disabled_controller_skipped() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        let id = m.attach(mock("a", 10, &log)).unwrap();
        assert!(m.set_enabled(id, false));
        m.chain().run_transition(&ctx(Transition::Start), || Ok(()));
        assert!(log.entries().is_empty());
        assert_eq!(m.get(id).unwrap().get("enabled").unwrap(), &json!(false));
    }

    // ── Invocations ──────────────────────────────────────────

    #[test]
    fn invocation_reaches_terminal_and_unwinds() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        m.attach(mock("a", 10, &log)).unwrap();
        m.attach(mock("b", 20, &log)).unwrap();

        let result = m.chain().run_invocation(inv("get"), |_| Ok(json!("value")));
        assert_eq!(result.unwrap(), json!("value"));
        assert_eq!(
            log.entries(),
            vec!["a:intercept:get", "b:intercept:get", "b:complete:get", "a:complete:get"]
        );
    }

    #[test]
    fn respond_short_circuits() {
        let log = CallLog::new();
        let mut m = Membrane::new();
        m.attach(Arc::new(
            MockController::new("cache")
                .with_priority(10)
                .with_log(&log)
                .responding(json!("cached")),
        ))
        .unwrap();
        m.attach(mock("b", 20, &log)).unwrap();

        let mut reached = false;
        let result = m.chain().run_invocation(inv("get"), |_| {
            reached = true;
            Ok(json!("fresh"))
        });
        assert!(!reached);
        assert_eq!(result.unwrap(), json!("cached"));
        assert_eq!(log.entries(), vec!["cache:intercept:get", "cache:complete:get"]);
    }

    #[test]
    fn fail_short_circuits_with_error() {
        let mut m = Membrane::new();
        m.attach(Arc::new(
            MockController::new("acl").failing(ComponentError::Denied("no".into())),
        ))
        .unwrap();
        let result = m.chain().run_invocation(inv("put"), |_| Ok(json!(null)));
        assert_eq!(result, Err(ComponentError::Denied("no".into())));
    }

    #[test]
    fn chains_concatenate() {
        let log = CallLog::new();
        let mut caller = Membrane::new();
        caller.attach(mock("caller", 100, &log)).unwrap();
        let mut provider = Membrane::new();
        provider.attach(mock("provider", 1, &log)).unwrap();

        let chain = caller.chain().then(provider.chain());
        assert_eq!(chain.len(), 2);
        chain.run_invocation(inv("op"), |_| Ok(json!(1))).unwrap();
        assert_eq!(
            log.entries(),
            vec![
                "caller:intercept:op",
                "provider:intercept:op",
                "provider:complete:op",
                "caller:complete:op",
            ]
        );
    }

    #[test]
    fn rewritten_invocation_reaches_terminal() {
        let mut m = Membrane::new();
        m.attach(Arc::new(
            MockController::new("rw").rewriting(|inv| inv.operation = "renamed".into()),
        ))
        .unwrap();
        let result = m
            .chain()
            .run_invocation(inv("orig"), |inv| Ok(json!(inv.operation.clone())));
        assert_eq!(result.unwrap(), json!("renamed"));
    }
}
