//! Bindings: directed edges from a required port to a provided port.
//!
//! A [`Binding`] is an immutable record. Rebinding produces a new record
//! with the same id and a different provided side, which the engine
//! swaps in under the required port's lock.

use crate::{Attributes, Reflective};
use serde::{Deserialize, Serialize};
use serde_json::json;
use weft_types::{BindingId, NodeKey, PortId};

/// Default binding priority.
pub const DEFAULT_BINDING_PRIORITY: i32 = 100;

/// How a call crosses a binding.
///
/// Serialized as a plain string: `"local"`, `"proxied"`, `"remote"`,
/// anything else becomes [`BindingKind::Custom`].
///
/// ```
/// use weft_component::BindingKind;
///
/// assert_eq!(BindingKind::from("remote"), BindingKind::Remote);
/// assert_eq!(BindingKind::from("grpc"), BindingKind::Custom("grpc".into()));
/// assert_eq!(BindingKind::Custom("grpc".into()).to_string(), "grpc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BindingKind {
    /// Direct in-process call.
    #[default]
    Local,
    /// In-process call through an interposed proxy.
    Proxied,
    /// Call forwarded to a remote adapter.
    Remote,
    /// User-defined kind.
    Custom(String),
}

impl From<&str> for BindingKind {
    fn from(s: &str) -> Self {
        match s {
            "local" => Self::Local,
            "proxied" => Self::Proxied,
            "remote" => Self::Remote,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for BindingKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<BindingKind> for String {
    fn from(kind: BindingKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for BindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Proxied => write!(f, "proxied"),
            Self::Remote => write!(f, "remote"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// When the target of a binding is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Target fixed at creation until explicitly rebound.
    Eager,
    /// Target re-resolved on every call.
    #[default]
    Lazy,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eager => write!(f, "eager"),
            Self::Lazy => write!(f, "lazy"),
        }
    }
}

/// Options accepted by the engine's `bind_with`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    /// Transport kind.
    pub kind: BindingKind,
    /// Eager or lazy.
    pub resolution: Resolution,
    /// Higher wins when a single target must be selected.
    pub priority: i32,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            kind: BindingKind::Local,
            resolution: Resolution::Lazy,
            priority: DEFAULT_BINDING_PRIORITY,
        }
    }
}

impl BindOptions {
    /// Options with the given kind and resolution, default priority.
    #[must_use]
    pub fn new(kind: BindingKind, resolution: Resolution) -> Self {
        Self {
            kind,
            resolution,
            priority: DEFAULT_BINDING_PRIORITY,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A live binding.
///
/// Equality and hashing use the binding id only.
#[derive(Debug, Clone)]
pub struct Binding {
    id: BindingId,
    required: PortId,
    provided: PortId,
    kind: BindingKind,
    resolution: Resolution,
    priority: i32,
    seq: u64,
    attributes: Attributes,
}

impl Binding {
    /// Creates a binding record. `seq` orders bindings by insertion.
    #[must_use]
    pub fn new(required: PortId, provided: PortId, options: BindOptions, seq: u64) -> Self {
        let id = BindingId::new();
        let mut binding = Self {
            id,
            required,
            provided,
            kind: options.kind,
            resolution: options.resolution,
            priority: options.priority,
            seq,
            attributes: Attributes::new(),
        };
        binding.mirror_system();
        binding
    }

    /// Same binding, retargeted to `provided`.
    #[must_use]
    pub fn retarget(&self, provided: PortId) -> Self {
        let mut next = self.clone();
        next.provided = provided;
        next.mirror_system();
        next
    }

    fn mirror_system(&mut self) {
        let a = &mut self.attributes;
        a.set_system("id", json!(self.id.to_string()));
        a.set_system("required", json!(self.required.to_string()));
        a.set_system("provided", json!(self.provided.to_string()));
        a.set_system("kind", json!(self.kind.to_string()));
        a.set_system("resolution", json!(self.resolution.to_string()));
        a.set_system("priority", json!(self.priority));
    }

    /// Binding id.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    /// Required (client) side.
    #[must_use]
    pub fn required(&self) -> PortId {
        self.required
    }

    /// Provided (server) side.
    #[must_use]
    pub fn provided(&self) -> PortId {
        self.provided
    }

    /// Target recorded at creation; `None` for lazy bindings.
    #[must_use]
    pub fn target(&self) -> Option<PortId> {
        match self.resolution {
            Resolution::Eager => Some(self.provided),
            Resolution::Lazy => None,
        }
    }

    /// Transport kind.
    #[must_use]
    pub fn kind(&self) -> &BindingKind {
        &self.kind
    }

    /// Eager or lazy.
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Selection priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Insertion sequence number.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Binding {}

impl std::hash::Hash for Binding {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Reflective for Binding {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_string_roundtrip() {
        for kind in [
            BindingKind::Local,
            BindingKind::Proxied,
            BindingKind::Remote,
            BindingKind::Custom("amqp".into()),
        ] {
            let s: String = kind.clone().into();
            assert_eq!(BindingKind::from(s), kind);
        }
    }

    #[test]
    fn kind_serde_as_plain_string() {
        let json = serde_json::to_string(&BindingKind::Remote).unwrap();
        assert_eq!(json, "\"remote\"");
        let custom: BindingKind = serde_json::from_str("\"ws\"").unwrap();
        assert_eq!(custom, BindingKind::Custom("ws".into()));
    }

    #[test]
    fn eager_records_target_lazy_does_not() {
        let (r, p) = (PortId::new(), PortId::new());
        let eager = Binding::new(r, p, BindOptions::new(BindingKind::Local, Resolution::Eager), 0);
        let lazy = Binding::new(r, p, BindOptions::default(), 1);
        assert_eq!(eager.target(), Some(p));
        assert_eq!(lazy.target(), None);
        assert_eq!(lazy.priority(), DEFAULT_BINDING_PRIORITY);
    }

    #[test]
    fn retarget_keeps_identity() {
        let (r, p, q) = (PortId::new(), PortId::new(), PortId::new());
        let b = Binding::new(r, p, BindOptions::new(BindingKind::Local, Resolution::Eager), 7);
        let c = b.retarget(q);
        assert_eq!(b, c);
        assert_eq!(c.provided(), q);
        assert_eq!(c.target(), Some(q));
        assert_eq!(c.seq(), 7);
        assert_eq!(c.get("provided").unwrap(), &json!(q.to_string()));
    }

    #[test]
    fn system_attributes_reserved() {
        let mut b = Binding::new(PortId::new(), PortId::new(), BindOptions::default(), 0);
        assert_eq!(b.get("kind").unwrap(), "local");
        assert_eq!(b.get("resolution").unwrap(), "lazy");
        assert!(b.set("kind", json!("remote")).is_err());
        assert!(b.set("note", json!("hot path")).is_ok());
    }

    #[test]
    fn bind_options_partial_deserialize() {
        let opts: BindOptions = serde_json::from_str(r#"{"priority": 5}"#).unwrap();
        assert_eq!(opts.kind, BindingKind::Local);
        assert_eq!(opts.resolution, Resolution::Lazy);
        assert_eq!(opts.priority, 5);
    }
}
