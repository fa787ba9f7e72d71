//! The engine: component arena, ports and membranes.
//!
//! [`Engine`] is a cheap handle over shared state; clone it freely
//! across threads. The arena maps components and ports by identity:
//!
//! ```text
//! EngineInner
//!   components  RwLock<HashMap<ComponentId, Arc<ComponentCell>>>
//!   ports       RwLock<HashMap<PortId, Arc<PortCell>>>
//!   bindings    RwLock<HashMap<BindingId, PortId>>      binding → required port
//!   controllers RwLock<HashMap<ControllerId, ComponentId>>
//!   topology    Mutex<()>                               attach/detach only
//! ```
//!
//! Map locks are held only long enough to clone an `Arc`; the work
//! happens under the per-cell locks described in [`cell`].
//!
//! Operations are spread over the modules that own them:
//! graph edges in `graph`, bindings in `binding`, transitions in
//! `lifecycle`, calls in `invoke`, plans in `factory`.

mod attributes;
pub(crate) mod cell;
mod error;
mod view;

pub(crate) use cell::{ComponentCell, ComponentNode, Link, PortCell, PortLinks};
pub use error::EngineError;
pub use view::ComponentView;

use crate::bootstrap::LoaderController;
use crate::config::EngineConfig;
use crate::factory::{
    FactoryService, PayloadCatalog, BOOTSTRAP_KEY, FACTORY_CONTRACT, FACTORY_KEY, FACTORY_PORT,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use weft_component::{
    Business, Cardinality, ContractRegistry, LifecycleState, Port, PortSpec,
};
use weft_controller::builtin::SnapshotStore;
use weft_controller::{Controller, ControllerCatalog, ControllerError, ControllerSpec};
use weft_types::{BindingId, ComponentId, ControllerId, PortId};

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) components: RwLock<HashMap<ComponentId, Arc<ComponentCell>>>,
    pub(crate) ports: RwLock<HashMap<PortId, Arc<PortCell>>>,
    pub(crate) bindings: RwLock<HashMap<BindingId, PortId>>,
    pub(crate) controllers: RwLock<HashMap<ControllerId, ComponentId>>,
    pub(crate) topology: Mutex<()>,
    /// Held for a whole plan instantiation. Reentrant so payload builders
    /// and factory invocations may instantiate nested plans.
    pub(crate) instantiation: ReentrantMutex<()>,
    pub(crate) unreachable: Mutex<Vec<ComponentId>>,
    pub(crate) contracts: RwLock<ContractRegistry>,
    pub(crate) controller_catalog: RwLock<ControllerCatalog>,
    pub(crate) payload_catalog: RwLock<PayloadCatalog>,
    pub(crate) loader: Arc<LoaderController>,
    seq: AtomicU64,
}

/// Handle to a composition engine.
///
/// A fresh engine holds two components: `bootstrap`, the root every
/// loaded plan hangs from, and its child `factory`, which instantiates
/// plans sent to its `factory` port.
///
/// # Example
///
/// ```
/// use weft_component::{BindingKind, PortSpec, Resolution};
/// use weft_runtime::Engine;
///
/// let engine = Engine::new();
/// let a = engine.create_component("a");
/// let b = engine.create_component("b");
/// let r = engine.add_port(a, PortSpec::required("r", "X")).unwrap();
/// let p = engine.add_port(b, PortSpec::provided("p", "X")).unwrap();
///
/// engine.bind(r, p, BindingKind::Local, Resolution::Eager).unwrap();
/// assert_eq!(engine.resolve(r).unwrap().ports(), vec![p]);
/// ```
#[derive(Clone)]
pub struct Engine {
    pub(crate) inner: Arc<EngineInner>,
}

impl Engine {
    /// Creates an engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with `config`.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let inner = Arc::new(EngineInner {
            config,
            components: RwLock::new(HashMap::new()),
            ports: RwLock::new(HashMap::new()),
            bindings: RwLock::new(HashMap::new()),
            controllers: RwLock::new(HashMap::new()),
            topology: Mutex::new(()),
            instantiation: ReentrantMutex::new(()),
            unreachable: Mutex::new(Vec::new()),
            contracts: RwLock::new(ContractRegistry::new()),
            controller_catalog: RwLock::new(ControllerCatalog::with_builtins()),
            payload_catalog: RwLock::new(PayloadCatalog::new()),
            loader: Arc::new(LoaderController::new()),
            seq: AtomicU64::new(0),
        });
        let engine = Self { inner };
        engine.install_roots();
        engine
    }

    pub(crate) fn from_inner(inner: Arc<EngineInner>) -> Self {
        Self { inner }
    }

    fn install_roots(&self) {
        let bootstrap = self.insert_component(BOOTSTRAP_KEY, Some(BOOTSTRAP_KEY), None, BTreeMap::new());
        let service = FactoryService::new(Arc::downgrade(&self.inner));
        let factory = self.insert_component(
            FACTORY_KEY,
            Some(FACTORY_KEY),
            Some(Arc::new(service)),
            BTreeMap::new(),
        );
        let port = Port::new(
            factory.id,
            PortSpec::provided(FACTORY_PORT, FACTORY_CONTRACT).with_cardinality(Cardinality::any()),
        );
        let _ = self.register_port(&factory, port);
        self.link_edge(bootstrap.id, factory.id);
    }

    /// The root component.
    #[must_use]
    pub fn bootstrap_id(&self) -> ComponentId {
        ComponentId::keyed(BOOTSTRAP_KEY)
    }

    /// The factory component.
    #[must_use]
    pub fn factory_id(&self) -> ComponentId {
        ComponentId::keyed(FACTORY_KEY)
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Declares that `specific` satisfies `general`.
    ///
    /// Returns `false` if the declaration was ignored (duplicate, or it
    /// would make subsumption cyclic).
    pub fn declare_contract(&self, specific: &str, general: &str) -> bool {
        self.inner.contracts.write().declare(specific, general)
    }

    /// Registers a payload builder referenced by plans.
    pub fn register_payload<F>(&self, name: impl Into<String>, builder: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn Business>, String> + Send + Sync + 'static,
    {
        self.inner.payload_catalog.write().register(name, builder);
    }

    /// Registers a controller kind referenced by plans and config.
    pub fn register_controller<F>(&self, kind: impl Into<String>, builder: F)
    where
        F: Fn(&ControllerSpec) -> Result<Arc<dyn Controller>, ControllerError>
            + Send
            + Sync
            + 'static,
    {
        self.inner.controller_catalog.write().register(kind, builder);
    }

    /// Store shared by `snapshot` controllers built by this engine.
    #[must_use]
    pub fn snapshots(&self) -> SnapshotStore {
        self.inner.controller_catalog.read().snapshots().clone()
    }

    /// Creates a component without payload, in state NEW and unattached.
    pub fn create_component(&self, name: &str) -> ComponentId {
        self.insert_component(name, None, None, BTreeMap::new()).id
    }

    /// Creates a component that serves invocations with `payload`.
    pub fn create_component_with(&self, name: &str, payload: Arc<dyn Business>) -> ComponentId {
        self.insert_component(name, None, Some(payload), BTreeMap::new())
            .id
    }

    pub(crate) fn insert_component(
        &self,
        name: &str,
        key: Option<&str>,
        payload: Option<Arc<dyn Business>>,
        attributes: BTreeMap<String, Value>,
    ) -> Arc<ComponentCell> {
        let id = key.map_or_else(ComponentId::new, ComponentId::keyed);
        let node = ComponentNode::new(id, name, key, attributes);
        let cell = Arc::new(ComponentCell::new(node, payload));
        self.inner.components.write().insert(id, Arc::clone(&cell));
        debug!(component = %id, name, "component created");
        cell
    }

    /// Declares a port on a component.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the component does not exist
    /// - [`EngineError::InvalidPort`] for a blank name or contract, or a
    ///   malformed cardinality
    /// - [`EngineError::DuplicatePort`] if the name is taken
    pub fn add_port(&self, component: ComponentId, spec: PortSpec) -> Result<PortId, EngineError> {
        check_port_spec(&spec)?;
        let cell = self.cell(component)?;
        let name = spec.name.clone();
        let Some(port_cell) = self.register_port(&cell, Port::new(component, spec)) else {
            return Err(EngineError::DuplicatePort { component, name });
        };
        debug!(component = %component, port = %port_cell.id, name = %port_cell.name(), "port added");
        self.refresh_degradation(&port_cell);
        Ok(port_cell.id)
    }

    fn register_port(&self, owner: &ComponentCell, port: Port) -> Option<Arc<PortCell>> {
        let mut node = owner.node.write();
        if node.port(port.name()).is_some() {
            return None;
        }
        let cell = Arc::new(PortCell::new(port));
        node.ports.push((cell.name().to_string(), cell.id));
        self.inner.ports.write().insert(cell.id, Arc::clone(&cell));
        Some(cell)
    }

    /// Port id by owner and name.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the component or port does not exist.
    pub fn port(&self, component: ComponentId, name: &str) -> Result<PortId, EngineError> {
        self.cell(component)?
            .node
            .read()
            .port(name)
            .ok_or_else(|| EngineError::not_found(format!("port '{name}' on {component}")))
    }

    /// Declaration of a port.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the port does not exist.
    pub fn port_spec(&self, port: PortId) -> Result<PortSpec, EngineError> {
        Ok(self.port_cell(port)?.spec.clone())
    }

    /// Owner of a port.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the port does not exist.
    pub fn port_owner(&self, port: PortId) -> Result<ComponentId, EngineError> {
        Ok(self.port_cell(port)?.owner)
    }

    /// Attaches a controller to a component's membrane at its own priority.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the component does not exist
    /// - [`EngineError::DuplicateController`] if a single-instance
    ///   controller of the same kind is already attached
    pub fn attach_controller(
        &self,
        component: ComponentId,
        controller: Arc<dyn Controller>,
    ) -> Result<ControllerId, EngineError> {
        let priority = controller.priority();
        self.attach_controller_at(component, controller, priority, true)
    }

    /// Builds a controller from a declaration and attaches it.
    ///
    /// # Errors
    ///
    /// As [`Engine::attach_controller`], plus [`EngineError::Controller`]
    /// for an unknown kind or malformed config.
    pub fn attach_controller_spec(
        &self,
        component: ComponentId,
        spec: &ControllerSpec,
    ) -> Result<ControllerId, EngineError> {
        let controller = self
            .inner
            .controller_catalog
            .read()
            .build(spec)
            .map_err(|e| EngineError::controller(component, e))?;
        let priority = spec.priority.unwrap_or_else(|| controller.priority());
        self.attach_controller_at(component, controller, priority, spec.enabled)
    }

    /// Attaches the configured membrane controllers, skipping kinds that
    /// `overrides` declares.
    pub(crate) fn attach_uniform(
        &self,
        component: ComponentId,
        overrides: &[ControllerSpec],
    ) -> Result<(), EngineError> {
        let uniform = self
            .inner
            .config
            .membrane
            .controllers
            .iter()
            .filter(|c| !overrides.iter().any(|o| o.kind == c.kind));
        for spec in uniform {
            self.attach_controller_spec(component, spec)?;
        }
        Ok(())
    }

    fn attach_controller_at(
        &self,
        component: ComponentId,
        controller: Arc<dyn Controller>,
        priority: i32,
        enabled: bool,
    ) -> Result<ControllerId, EngineError> {
        let cell = self.cell(component)?;
        let kind = controller.kind().to_string();
        let id = {
            let mut node = cell.node.write();
            let id = node
                .membrane
                .attach_with_priority(controller, priority)
                .map_err(|e| EngineError::controller(component, e))?;
            if !enabled {
                node.membrane.set_enabled(id, false);
            }
            id
        };
        self.inner.controllers.write().insert(id, component);
        debug!(component = %component, controller = %id, kind = %kind, priority, "controller attached");
        Ok(id)
    }

    /// Removes a controller from a component's membrane.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the component or controller does not
    /// exist.
    pub fn detach_controller(
        &self,
        component: ComponentId,
        controller: ControllerId,
    ) -> Result<(), EngineError> {
        let cell = self.cell(component)?;
        let removed = cell.node.write().membrane.detach(controller);
        if removed.is_none() {
            return Err(EngineError::not_found(controller));
        }
        self.inner.controllers.write().remove(&controller);
        debug!(component = %component, controller = %controller, "controller detached");
        Ok(())
    }

    /// Lifecycle state of a component.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the component does not exist.
    pub fn state(&self, component: ComponentId) -> Result<LifecycleState, EngineError> {
        Ok(self.cell(component)?.state())
    }

    /// Returns `true` if any required port of the component is below its
    /// minimum while STARTED.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the component does not exist.
    pub fn is_degraded(&self, component: ComponentId) -> Result<bool, EngineError> {
        Ok(!self.cell(component)?.node.read().degraded.is_empty())
    }

    /// Required ports currently below their minimum.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the component does not exist.
    pub fn degraded_ports(&self, component: ComponentId) -> Result<Vec<PortId>, EngineError> {
        Ok(self
            .cell(component)?
            .node
            .read()
            .degraded
            .iter()
            .copied()
            .collect())
    }

    /// Snapshot of a component.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the component does not exist.
    pub fn view(&self, component: ComponentId) -> Result<ComponentView, EngineError> {
        Ok(ComponentView::of(&self.cell(component)?.node.read()))
    }

    /// Returns `true` if the component exists.
    #[must_use]
    pub fn contains(&self, component: ComponentId) -> bool {
        self.inner.components.read().contains_key(&component)
    }

    /// Every live component, sorted by id.
    #[must_use]
    pub fn component_ids(&self) -> Vec<ComponentId> {
        let mut ids: Vec<ComponentId> = self.inner.components.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of live components, `bootstrap` and `factory` included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.components.read().len()
    }

    /// Always `false`: the root components exist for the engine's lifetime.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn cell(&self, id: ComponentId) -> Result<Arc<ComponentCell>, EngineError> {
        self.inner
            .components
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(id))
    }

    pub(crate) fn port_cell(&self, id: PortId) -> Result<Arc<PortCell>, EngineError> {
        self.inner
            .ports
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(id))
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.inner.seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("components", &self.len())
            .field("ports", &self.inner.ports.read().len())
            .field("bindings", &self.inner.bindings.read().len())
            .finish()
    }
}

/// Structural checks on a port declaration.
pub(crate) fn check_port_spec(spec: &PortSpec) -> Result<(), EngineError> {
    let invalid = |reason: String| EngineError::InvalidPort {
        port: spec.name.clone(),
        reason,
    };
    if spec.name.trim().is_empty() {
        return Err(invalid("name must not be blank".into()));
    }
    if spec.contract.trim().is_empty() {
        return Err(invalid("contract must not be blank".into()));
    }
    spec.cardinality
        .validate()
        .map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_controller::testing::MockController;

    #[test]
    fn fresh_engine_has_roots() {
        let engine = Engine::new();
        assert_eq!(engine.len(), 2);
        let boot = engine.view(engine.bootstrap_id()).unwrap();
        assert_eq!(boot.children, vec![engine.factory_id()]);
        let factory = engine.view(engine.factory_id()).unwrap();
        assert_eq!(factory.parents, vec![engine.bootstrap_id()]);
        assert!(factory.port(FACTORY_PORT).is_some());
    }

    #[test]
    fn create_component_starts_new_and_unattached() {
        let engine = Engine::new();
        let c = engine.create_component("svc");
        let view = engine.view(c).unwrap();
        assert_eq!(view.state, LifecycleState::New);
        assert!(view.parents.is_empty());
        assert_eq!(view.name, "svc");
        assert!(view.key.is_none());
    }

    #[test]
    fn duplicate_port_name_rejected() {
        let engine = Engine::new();
        let c = engine.create_component("svc");
        engine.add_port(c, PortSpec::provided("p", "X")).unwrap();
        assert!(matches!(
            engine.add_port(c, PortSpec::required("p", "Y")),
            Err(EngineError::DuplicatePort { .. })
        ));
        assert_eq!(engine.view(c).unwrap().ports.len(), 1);
    }

    #[test]
    fn malformed_port_rejected() {
        let engine = Engine::new();
        let c = engine.create_component("svc");
        let spec = PortSpec::required("r", "X").with_cardinality(Cardinality::new(2, 1));
        assert!(matches!(
            engine.add_port(c, spec),
            Err(EngineError::InvalidPort { .. })
        ));
        assert!(matches!(
            engine.add_port(c, PortSpec::required("r", " ")),
            Err(EngineError::InvalidPort { .. })
        ));
    }

    #[test]
    fn closed_port_accepts_no_binding() {
        let engine = Engine::new();
        let a = engine.create_component("a");
        let b = engine.create_component("b");
        let closed = PortSpec::required("r", "X").with_cardinality(Cardinality::new(0, 0));
        let r = engine.add_port(a, closed).unwrap();
        let p = engine.add_port(b, PortSpec::provided("p", "X")).unwrap();
        assert!(matches!(
            engine.bind(r, p, weft_component::BindingKind::Local, weft_component::Resolution::Lazy),
            Err(EngineError::CardinalityExceeded { max: 0, .. })
        ));
        engine.start(a).unwrap();
    }

    #[test]
    fn port_lookup() {
        let engine = Engine::new();
        let c = engine.create_component("svc");
        let p = engine.add_port(c, PortSpec::provided("p", "X")).unwrap();
        assert_eq!(engine.port(c, "p").unwrap(), p);
        assert_eq!(engine.port_owner(p).unwrap(), c);
        assert_eq!(engine.port_spec(p).unwrap().contract, "X");
        assert!(matches!(engine.port(c, "q"), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn controllers_unique_by_kind() {
        let engine = Engine::new();
        let c = engine.create_component("svc");
        engine
            .attach_controller(c, Arc::new(MockController::new("audit")))
            .unwrap();
        assert!(matches!(
            engine.attach_controller(c, Arc::new(MockController::new("audit"))),
            Err(EngineError::DuplicateController { .. })
        ));
        engine
            .attach_controller(c, Arc::new(MockController::new("tap").multi()))
            .unwrap();
        engine
            .attach_controller(c, Arc::new(MockController::new("tap").multi()))
            .unwrap();
        assert_eq!(engine.view(c).unwrap().controllers.len(), 3);
    }

    #[test]
    fn controller_spec_uses_catalog() {
        let engine = Engine::new();
        let c = engine.create_component("svc");
        let spec = ControllerSpec::new("trace").with_priority(42);
        let id = engine.attach_controller_spec(c, &spec).unwrap();
        assert_eq!(
            engine.attribute(id.into(), "priority").unwrap(),
            serde_json::json!(42)
        );
        assert!(matches!(
            engine.attach_controller_spec(c, &ControllerSpec::new("nope")),
            Err(EngineError::Controller(ControllerError::UnknownKind { .. }))
        ));

        engine.detach_controller(c, id).unwrap();
        assert!(engine.view(c).unwrap().controllers.is_empty());
        assert!(engine.detach_controller(c, id).is_err());
    }
}
