//! Per-node storage.
//!
//! Every component and port lives in its own cell with its own locks, so
//! unrelated parts of the graph never contend.
//!
//! ```text
//! ComponentCell
//!   node       RwLock   name, state, ports, edges, membrane, attributes
//!   transition Mutex    one lifecycle transition at a time
//!   gate       RwLock   write while a transition chain runs,
//!                       read while an invocation is inside
//!
//! PortCell
//!   port       RwLock   reflective port record
//!   links      RwLock   bindings; rebind swaps under write
//! ```
//!
//! Only one node lock is ever held at a time, except port links, which
//! are taken together in [`PortId`] order.

use crate::binding::Target;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use weft_component::{
    Attributes, Binding, Business, Cardinality, Direction, LifecycleState, Port, PortSpec,
    Reflective, Resolution,
};
use weft_controller::Membrane;
use weft_types::{BindingId, ComponentId, NodeKey, PortId};

/// Mutable state of a component, behind [`ComponentCell::node`].
#[derive(Debug)]
pub(crate) struct ComponentNode {
    pub(crate) id: ComponentId,
    pub(crate) name: String,
    pub(crate) key: Option<String>,
    pub(crate) state: LifecycleState,
    pub(crate) attributes: Attributes,
    /// Declaration order; names are unique.
    pub(crate) ports: Vec<(String, PortId)>,
    pub(crate) children: Vec<ComponentId>,
    pub(crate) parents: Vec<ComponentId>,
    pub(crate) degraded: BTreeSet<PortId>,
    pub(crate) membrane: Membrane,
}

impl ComponentNode {
    pub(crate) fn new(
        id: ComponentId,
        name: &str,
        key: Option<&str>,
        user: BTreeMap<String, Value>,
    ) -> Self {
        let mut attributes = Attributes::from_user(user);
        attributes.set_system("id", json!(id.to_string()));
        attributes.set_system("name", json!(name));
        if let Some(key) = key {
            attributes.set_system("key", json!(key));
        }
        let mut node = Self {
            id,
            name: name.to_string(),
            key: key.map(str::to_string),
            state: LifecycleState::New,
            attributes,
            ports: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
            degraded: BTreeSet::new(),
            membrane: Membrane::new(),
        };
        node.set_state(LifecycleState::New);
        node.mirror_degraded();
        node
    }

    pub(crate) fn set_state(&mut self, state: LifecycleState) {
        self.state = state;
        self.attributes
            .set_system("state", json!(state.to_string()));
    }

    /// Records whether `port` is below its minimum. Only a STARTED
    /// component becomes degraded. Returns `true` if the flag changed.
    pub(crate) fn track_degraded(&mut self, port: PortId, under: bool) -> bool {
        let changed = if under && self.state.is_started() {
            self.degraded.insert(port)
        } else if !under {
            self.degraded.remove(&port)
        } else {
            false
        };
        if changed {
            self.mirror_degraded();
        }
        changed
    }

    pub(crate) fn clear_degraded(&mut self) {
        self.degraded.clear();
        self.mirror_degraded();
    }

    fn mirror_degraded(&mut self) {
        self.attributes
            .set_system("degraded", json!(!self.degraded.is_empty()));
    }

    pub(crate) fn port(&self, name: &str) -> Option<PortId> {
        self.ports
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }
}

impl Reflective for ComponentNode {
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

/// A component and its locks.
pub(crate) struct ComponentCell {
    pub(crate) id: ComponentId,
    pub(crate) node: RwLock<ComponentNode>,
    pub(crate) transition: Mutex<()>,
    /// Serializes keep-or-stop decisions made by stopping parents.
    pub(crate) release: Mutex<()>,
    pub(crate) gate: RwLock<()>,
    pub(crate) payload: Option<Arc<dyn Business>>,
}

impl ComponentCell {
    pub(crate) fn new(node: ComponentNode, payload: Option<Arc<dyn Business>>) -> Self {
        Self {
            id: node.id,
            node: RwLock::new(node),
            transition: Mutex::new(()),
            release: Mutex::new(()),
            gate: RwLock::new(()),
            payload,
        }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.node.read().state
    }

    pub(crate) fn children(&self) -> Vec<ComponentId> {
        self.node.read().children.clone()
    }

    pub(crate) fn parents(&self) -> Vec<ComponentId> {
        self.node.read().parents.clone()
    }
}

/// A binding as held by its required port.
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub(crate) binding: Binding,
    /// Owner of the provided port.
    pub(crate) provider: ComponentId,
}

impl Link {
    pub(crate) fn target(&self) -> Target {
        Target {
            binding: self.binding.id(),
            port: self.binding.provided(),
            component: self.provider,
            kind: self.binding.kind().clone(),
        }
    }
}

/// Bindings touching one port.
///
/// A required port owns its outgoing [`Link`]s; a provided port only
/// counts incoming ones.
#[derive(Debug, Default)]
pub(crate) struct PortLinks {
    pub(crate) outgoing: Vec<Link>,
    pub(crate) incoming: Vec<(BindingId, PortId)>,
    /// Target of a single eager binding on a single-valued port.
    pub(crate) cached: Option<Target>,
}

impl PortLinks {
    pub(crate) fn count(&self, direction: Direction) -> usize {
        match direction {
            Direction::Required => self.outgoing.len(),
            Direction::Provided => self.incoming.len(),
        }
    }

    pub(crate) fn refresh_cache(&mut self, cardinality: Cardinality) {
        self.cached = match self.outgoing.as_slice() {
            [only]
                if !cardinality.is_multiple()
                    && only.binding.resolution() == Resolution::Eager =>
            {
                Some(only.target())
            }
            _ => None,
        };
    }

    pub(crate) fn position(&self, binding: BindingId) -> Option<usize> {
        self.outgoing.iter().position(|l| l.binding.id() == binding)
    }
}

/// A port and its locks.
pub(crate) struct PortCell {
    pub(crate) id: PortId,
    pub(crate) owner: ComponentId,
    pub(crate) spec: PortSpec,
    pub(crate) port: RwLock<Port>,
    pub(crate) links: RwLock<PortLinks>,
    /// Rotation for round-robin resolution.
    pub(crate) cursor: AtomicUsize,
}

impl PortCell {
    pub(crate) fn new(port: Port) -> Self {
        Self {
            id: port.id(),
            owner: port.owner(),
            spec: port.spec().clone(),
            port: RwLock::new(port),
            links: RwLock::new(PortLinks::default()),
            cursor: AtomicUsize::new(0),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.spec.name
    }

    pub(crate) fn direction(&self) -> Direction {
        self.spec.direction
    }

    pub(crate) fn cardinality(&self) -> Cardinality {
        self.spec.cardinality
    }

    pub(crate) fn count(&self) -> usize {
        self.links.read().count(self.direction())
    }
}
