//! Read-only snapshots of components.

use super::cell::ComponentNode;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use weft_component::LifecycleState;
use weft_types::{ComponentId, PortId};

/// A component as it was when the view was taken.
///
/// Views are detached copies: holding one locks nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentView {
    /// Identity.
    pub id: ComponentId,
    /// Display name.
    pub name: String,
    /// Plan key, for factory-built components.
    pub key: Option<String>,
    /// Lifecycle state.
    pub state: LifecycleState,
    /// Ports in declaration order.
    pub ports: Vec<(String, PortId)>,
    /// Children in insertion order.
    pub children: Vec<ComponentId>,
    /// Parents in insertion order.
    pub parents: Vec<ComponentId>,
    /// Required ports currently below their minimum.
    pub degraded_ports: Vec<PortId>,
    /// Membrane controller kinds in dispatch order.
    pub controllers: Vec<String>,
    /// User attributes.
    pub attributes: BTreeMap<String, Value>,
}

impl ComponentView {
    pub(crate) fn of(node: &ComponentNode) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            key: node.key.clone(),
            state: node.state,
            ports: node.ports.clone(),
            children: node.children.clone(),
            parents: node.parents.clone(),
            degraded_ports: node.degraded.iter().copied().collect(),
            controllers: node.membrane.kinds(),
            attributes: node.attributes.user(),
        }
    }

    /// Port id by name.
    #[must_use]
    pub fn port(&self, name: &str) -> Option<PortId> {
        self.ports.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    /// Returns `true` if any required port is below its minimum.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded_ports.is_empty()
    }

    /// User attribute by key.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
