//! Lifecycle transitions and their propagation over the graph.
//!
//! A transition on one component:
//!
//! ```text
//! transition mutex ─► legality ─► guards ─► gate(write) ─► membrane chain
//!                                                          before… commit after…
//! ```
//!
//! Propagation:
//!
//! | Operation | Order |
//! |-----------|-------|
//! | `start`   | configure NEW subtree bottom-up, start self, start children top-down |
//! | `stop`    | stop children in reverse insertion order, skipping shared children with another STARTED parent, stop self, re-check skipped children |
//! | `destroy` | stop if STARTED, destroy transition, dismantle ports, membrane and edges |

use crate::engine::ComponentCell;
use crate::{Engine, EngineError};
use std::collections::HashSet;
use tracing::{debug, info};
use weft_component::{Direction, LifecycleState, Transition};
use weft_controller::{TransitionContext, TransitionOutcome};
use weft_types::{ComponentId, PortId};

impl Engine {
    /// Configures a NEW component.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the component does not exist
    /// - [`EngineError::TransitionRejected`] if not NEW, or vetoed
    pub fn configure(&self, component: ComponentId) -> Result<(), EngineError> {
        let cell = self.cell(component)?;
        self.transition(&cell, Transition::Configure)
    }

    /// Starts a component and everything below it.
    ///
    /// NEW descendants are configured bottom-up first, so no component
    /// starts before its children are at least CONFIGURED. Then the
    /// component starts, then its children in insertion order. Starting a
    /// STARTED component only propagates to its children.
    ///
    /// A child that fails to start stops the propagation; the components
    /// already started stay STARTED.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the component does not exist
    /// - [`EngineError::TransitionRejected`] if a transition in the
    ///   subtree is illegal, unsatisfied or vetoed
    pub fn start(&self, component: ComponentId) -> Result<(), EngineError> {
        let mut configured = HashSet::new();
        self.configure_subtree(component, &mut configured)?;
        let mut started = HashSet::new();
        self.start_subtree(component, &mut started)
    }

    fn configure_subtree(
        &self,
        component: ComponentId,
        visited: &mut HashSet<ComponentId>,
    ) -> Result<(), EngineError> {
        if !visited.insert(component) {
            return Ok(());
        }
        let cell = self.cell(component)?;
        for child in cell.children() {
            self.configure_subtree(child, visited)?;
        }
        if cell.state() == LifecycleState::New {
            self.advance(&cell, Transition::Configure)?;
        }
        Ok(())
    }

    fn start_subtree(
        &self,
        component: ComponentId,
        visited: &mut HashSet<ComponentId>,
    ) -> Result<(), EngineError> {
        if !visited.insert(component) {
            return Ok(());
        }
        let cell = self.cell(component)?;
        if !cell.state().is_started() {
            self.advance(&cell, Transition::Start)?;
        }
        for child in cell.children() {
            self.start_subtree(child, visited)?;
        }
        Ok(())
    }

    /// Stops a STARTED component after its children.
    ///
    /// A child that another STARTED parent still holds keeps running. Kept
    /// children are checked again once this component has stopped, so the
    /// last of several parents stopping at once releases them.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the component does not exist
    /// - [`EngineError::TransitionRejected`] if not STARTED, or a stop in
    ///   the subtree is vetoed
    pub fn stop(&self, component: ComponentId) -> Result<(), EngineError> {
        let cell = self.cell(component)?;
        let state = cell.state();
        if !state.is_started() {
            return Err(EngineError::rejected(
                component,
                Transition::Stop,
                format!("illegal from {state}"),
            ));
        }
        let mut kept = Vec::new();
        for child in cell.children().into_iter().rev() {
            if !self.release_child(child, component)? {
                kept.push(child);
            }
        }
        self.transition(&cell, Transition::Stop)?;
        for child in kept {
            self.release_child(child, component)?;
        }
        Ok(())
    }

    /// Stops `child` on behalf of `parent` unless another STARTED parent
    /// holds it. Returns `false` if the child was kept running.
    fn release_child(&self, child: ComponentId, parent: ComponentId) -> Result<bool, EngineError> {
        let Ok(child_cell) = self.cell(child) else {
            return Ok(true);
        };
        let _release = child_cell.release.lock();
        if !child_cell.state().is_started() {
            return Ok(true);
        }
        if self.held_by_other_parent(&child_cell, parent) {
            debug!(component = %child, parent = %parent, "shared child kept running");
            return Ok(false);
        }
        self.stop(child)?;
        Ok(true)
    }

    fn held_by_other_parent(&self, child: &ComponentCell, stopping: ComponentId) -> bool {
        child
            .parents()
            .into_iter()
            .filter(|p| *p != stopping)
            .any(|p| self.cell(p).is_ok_and(|c| c.state().is_started()))
    }

    /// Destroys a component.
    ///
    /// Stops it first if STARTED, then runs the destroy transition. On
    /// commit the component leaves every parent, its ports and their
    /// bindings are destroyed, its membrane is cleared, and its children
    /// are detached. Children left without parents are queued as
    /// unreachable.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the component does not exist
    /// - [`EngineError::TransitionRejected`] for `bootstrap` and
    ///   `factory`, or if the stop or destroy is vetoed
    pub fn destroy(&self, component: ComponentId) -> Result<(), EngineError> {
        self.destroy_one(component)?;
        if self.inner.config.gc.auto_collect {
            self.collect_garbage();
        }
        Ok(())
    }

    pub(crate) fn destroy_one(&self, component: ComponentId) -> Result<(), EngineError> {
        if component == self.bootstrap_id() || component == self.factory_id() {
            return Err(EngineError::rejected(
                component,
                Transition::Destroy,
                "root components live as long as the engine",
            ));
        }
        let cell = self.cell(component)?;
        if cell.state().is_started() {
            self.stop(component)?;
        }
        self.transition(&cell, Transition::Destroy)?;
        self.dismantle(&cell, true);
        info!(component = %component, "component destroyed");
        Ok(())
    }

    /// Removes a component from the engine without running transitions.
    pub(crate) fn dismantle(&self, cell: &ComponentCell, queue_orphans: bool) {
        let id = cell.id;
        let mut orphans = Vec::new();
        {
            let _topology = self.inner.topology.lock();
            for parent in cell.parents() {
                self.unlink_edge(parent, id);
            }
            for child in cell.children() {
                self.unlink_edge(id, child);
                if self.cell(child).is_ok_and(|c| c.parents().is_empty()) {
                    orphans.push(child);
                }
            }
        }

        let ports: Vec<PortId> = cell.node.read().ports.iter().map(|(_, p)| *p).collect();
        for port in ports {
            self.destroy_port(port);
        }

        let controllers = {
            let mut node = cell.node.write();
            let ids = node.membrane.ids();
            node.membrane.clear();
            node.ports.clear();
            node.clear_degraded();
            node.set_state(LifecycleState::Destroyed);
            ids
        };
        {
            let mut index = self.inner.controllers.write();
            for controller in controllers {
                index.remove(&controller);
            }
        }

        self.inner.components.write().remove(&id);
        self.inner.unreachable.lock().retain(|c| *c != id);
        if queue_orphans {
            for orphan in orphans {
                self.queue_unreachable(orphan);
            }
        }
    }

    fn destroy_port(&self, port: PortId) {
        let Ok(cell) = self.port_cell(port) else {
            return;
        };
        let (outgoing, incoming) = {
            let links = cell.links.read();
            let outgoing: Vec<_> = links.outgoing.iter().map(|l| l.binding.id()).collect();
            (outgoing, links.incoming.clone())
        };
        for binding in outgoing {
            let _ = self.remove_link(&cell, binding);
        }
        for (binding, required) in incoming {
            let Ok(req) = self.port_cell(required) else {
                continue;
            };
            if self.remove_link(&req, binding).is_ok() {
                debug!(binding = %binding, required = %required, "binding dropped with its provider");
                self.refresh_degradation(&req);
            }
        }
        self.inner.ports.write().remove(&port);
    }

    /// Runs one transition through the component's membrane.
    pub(crate) fn transition(
        &self,
        cell: &ComponentCell,
        transition: Transition,
    ) -> Result<(), EngineError> {
        self.run_transition(cell, transition, false)
    }

    /// Like [`Engine::transition`], but succeeds without running the
    /// membrane if another caller already brought the component there.
    fn advance(&self, cell: &ComponentCell, transition: Transition) -> Result<(), EngineError> {
        self.run_transition(cell, transition, true)
    }

    fn run_transition(
        &self,
        cell: &ComponentCell,
        transition: Transition,
        skip_reached: bool,
    ) -> Result<(), EngineError> {
        let _serial = cell.transition.lock();
        let (ctx, chain, required) = {
            let node = cell.node.read();
            if skip_reached && reached(node.state, transition) {
                debug!(component = %cell.id, transition = %transition, "already reached");
                return Ok(());
            }
            let Some(to) = node.state.apply(transition) else {
                return Err(EngineError::rejected(
                    cell.id,
                    transition,
                    format!("illegal from {}", node.state),
                ));
            };
            let ctx = TransitionContext::new(cell.id, node.name.clone(), transition, node.state, to)
                .with_key(node.key.clone())
                .with_attributes(node.attributes.user())
                .with_degraded(!node.degraded.is_empty());
            let required: Vec<PortId> = node.ports.iter().map(|(_, p)| *p).collect();
            (ctx, node.membrane.chain(), required)
        };

        if transition == Transition::Start {
            self.check_required_ports(cell.id, &required)?;
        }

        let outcome = {
            let _gate = cell.gate.write();
            chain.run_transition(&ctx, || {
                let mut node = cell.node.write();
                if node.state != ctx.from {
                    return Err(format!("state moved to {}", node.state));
                }
                node.set_state(ctx.to);
                if matches!(transition, Transition::Start | Transition::Stop) {
                    node.clear_degraded();
                }
                Ok(())
            })
        };

        match outcome {
            TransitionOutcome::Committed => {
                info!(
                    component = %cell.id,
                    name = %ctx.name,
                    transition = %transition,
                    state = %ctx.to,
                    "transition committed"
                );
                Ok(())
            }
            TransitionOutcome::Vetoed { controller, reason } => Err(EngineError::rejected(
                cell.id,
                transition,
                format!("vetoed by {controller}: {reason}"),
            )),
            TransitionOutcome::Failed { reason } => {
                Err(EngineError::rejected(cell.id, transition, reason))
            }
        }
    }

    fn check_required_ports(&self, component: ComponentId, ports: &[PortId]) -> Result<(), EngineError> {
        for port in ports {
            let Ok(cell) = self.port_cell(*port) else {
                continue;
            };
            if cell.direction() != Direction::Required {
                continue;
            }
            let count = cell.count();
            if !cell.cardinality().admits(count) {
                return Err(EngineError::rejected(
                    component,
                    Transition::Start,
                    format!(
                        "required port '{}' has {count} binding(s), needs {}",
                        cell.name(),
                        cell.cardinality()
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn reached(state: LifecycleState, transition: Transition) -> bool {
    match transition {
        Transition::Configure => state != LifecycleState::New,
        Transition::Start => state.is_started(),
        _ => false,
    }
}
