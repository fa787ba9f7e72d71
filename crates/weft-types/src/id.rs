//! Identifier types for weft.
//!
//! All identifiers are UUID-based. Equality and hashing of every graph
//! node are derived from these identifiers, never from attribute contents.

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Namespace UUID for deterministic UUID v5 generation.
///
/// Components instantiated from a plan with a stable key get a UUID v5
/// derived from this namespace and the key.
const WEFT_NAMESPACE: Uuid = uuid!("6a0f3c1e-51b7-4f0e-9d7a-2c4b8e13f5a9");

/// Identifier for a Component in the composition graph.
///
/// # UUID Strategy
///
/// - **Keyed components** (instantiated from a plan key): UUID v5,
///   deterministic from the key
/// - **Anonymous components**: UUID v4 (random)
///
/// # Example
///
/// ```
/// use weft_types::ComponentId;
///
/// let a = ComponentId::keyed("billing");
/// let b = ComponentId::keyed("billing");
/// assert_eq!(a, b);
///
/// let c = ComponentId::new();
/// let d = ComponentId::new();
/// assert_ne!(c, d);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub Uuid);

#[allow(clippy::new_without_default)] // Ids are generated, not defaulted
impl ComponentId {
    /// Creates a new [`ComponentId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a component ID with a deterministic UUID v5 derived from a
    /// plan-supplied stable key.
    ///
    /// # Example
    ///
    /// ```
    /// use weft_types::ComponentId;
    ///
    /// assert_eq!(ComponentId::keyed("db"), ComponentId::keyed("db"));
    /// assert_ne!(ComponentId::keyed("db"), ComponentId::keyed("cache"));
    /// ```
    #[must_use]
    pub fn keyed(key: &str) -> Self {
        Self(Uuid::new_v5(
            &WEFT_NAMESPACE,
            format!("component:{key}").as_bytes(),
        ))
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

// NOTE: ComponentId intentionally does NOT implement Default.
// A default id would not be registered in any engine arena.

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "comp:{}", self.0)
    }
}

/// Identifier for a Port.
///
/// A port belongs to exactly one component; the id is unique across
/// the whole engine so ports can be addressed without their owner.
///
/// # Example
///
/// ```
/// use weft_types::PortId;
///
/// let p = PortId::new();
/// assert!(p.to_string().starts_with("port:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

#[allow(clippy::new_without_default)] // Generated by the engine when a port is created
impl PortId {
    /// Creates a new [`PortId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port:{}", self.0)
    }
}

/// Identifier for a Binding between two ports.
///
/// The id survives a rebind: swapping the provided side of a binding
/// keeps its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BindingId(pub Uuid);

#[allow(clippy::new_without_default)] // Generated by the resolver in bind()
impl BindingId {
    /// Creates a new [`BindingId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for BindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bind:{}", self.0)
    }
}

/// Identifier for a Controller attached to a component membrane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ControllerId(pub Uuid);

impl ControllerId {
    /// Creates a new [`ControllerId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctl:{}", self.0)
    }
}

/// Identity of any reflective node in the graph.
///
/// Every node kind (component, port, binding, controller) is addressable
/// through a `NodeKey`, which is what the uniform attribute protocol
/// takes as its target.
///
/// # Example
///
/// ```
/// use weft_types::{ComponentId, NodeKey};
///
/// let id = ComponentId::keyed("svc");
/// let key = NodeKey::from(id);
/// assert_eq!(key.kind(), "component");
/// assert_eq!(key.as_component(), Some(id));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeKey {
    /// A component.
    Component(ComponentId),
    /// A port.
    Port(PortId),
    /// A binding.
    Binding(BindingId),
    /// A controller.
    Controller(ControllerId),
}

impl NodeKey {
    /// Returns the node kind as a lowercase string.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Component(_) => "component",
            Self::Port(_) => "port",
            Self::Binding(_) => "binding",
            Self::Controller(_) => "controller",
        }
    }

    /// Returns the component id if this key names a component.
    #[must_use]
    pub fn as_component(&self) -> Option<ComponentId> {
        match self {
            Self::Component(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<ComponentId> for NodeKey {
    fn from(id: ComponentId) -> Self {
        Self::Component(id)
    }
}

impl From<PortId> for NodeKey {
    fn from(id: PortId) -> Self {
        Self::Port(id)
    }
}

impl From<BindingId> for NodeKey {
    fn from(id: BindingId) -> Self {
        Self::Binding(id)
    }
}

impl From<ControllerId> for NodeKey {
    fn from(id: ControllerId) -> Self {
        Self::Controller(id)
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Component(id) => write!(f, "{id}"),
            Self::Port(id) => write!(f, "{id}"),
            Self::Binding(id) => write!(f, "{id}"),
            Self::Controller(id) => write!(f, "{id}"),
        }
    }
}

// Tests live in lib.rs alongside the other public types.
