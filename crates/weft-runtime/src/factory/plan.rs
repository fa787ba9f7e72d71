//! Instantiation plans.
//!
//! A plan is a tree: each node declares one component and may nest the
//! plans of its children. Bindings are declared on any node and refer to
//! ports by owner key.
//!
//! # Example TOML
//!
//! ```toml
//! key = "app"
//! children = [
//!     "shared-cache",
//!     { key = "db", ports = [{ name = "sql", direction = "provided", contract = "db.sql" }] },
//! ]
//!
//! [[ports]]
//! name = "db"
//! direction = "required"
//! contract = "db.sql"
//!
//! [[bindings]]
//! required = { port = "db" }
//! provided = { component = "db", port = "sql" }
//! resolution = "eager"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use weft_component::{
    BindOptions, BindingKind, PortSpec, Resolution, DEFAULT_BINDING_PRIORITY,
};
use weft_controller::ControllerSpec;

/// Declarative description of a component tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstantiationPlan {
    /// Unique key; the component id is derived from it.
    pub key: String,
    /// Display name. Defaults to the key.
    pub name: Option<String>,
    /// Business payload, looked up in the engine's payload catalog.
    pub payload: Option<PayloadRef>,
    /// Initial user attributes.
    pub attributes: BTreeMap<String, Value>,
    /// Ports in declaration order.
    pub ports: Vec<PortSpec>,
    /// Controllers in attach order.
    pub controllers: Vec<ControllerSpec>,
    /// Children, by key or by nested plan.
    pub children: Vec<ChildRef>,
    /// Bindings created once the whole tree exists.
    pub bindings: Vec<BindingSpec>,
}

impl InstantiationPlan {
    /// A plan with only a key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the payload reference.
    #[must_use]
    pub fn with_payload(mut self, name: impl Into<String>, config: Value) -> Self {
        self.payload = Some(PayloadRef {
            name: name.into(),
            config,
        });
        self
    }

    /// Adds a user attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Adds a port.
    #[must_use]
    pub fn with_port(mut self, spec: PortSpec) -> Self {
        self.ports.push(spec);
        self
    }

    /// Adds a controller.
    #[must_use]
    pub fn with_controller(mut self, spec: ControllerSpec) -> Self {
        self.controllers.push(spec);
        self
    }

    /// Adds a child that already exists, or is planned elsewhere in the tree.
    #[must_use]
    pub fn with_child_key(mut self, key: impl Into<String>) -> Self {
        self.children.push(ChildRef::Key(key.into()));
        self
    }

    /// Adds a nested child plan.
    #[must_use]
    pub fn with_child(mut self, plan: InstantiationPlan) -> Self {
        self.children.push(ChildRef::Plan(Box::new(plan)));
        self
    }

    /// Adds a binding.
    #[must_use]
    pub fn with_binding(mut self, spec: BindingSpec) -> Self {
        self.bindings.push(spec);
        self
    }

    /// Name, falling back to the key.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }

    /// Every plan in the tree, pre-order, this one first.
    #[must_use]
    pub fn plans(&self) -> Vec<&InstantiationPlan> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(plan) = stack.pop() {
            out.push(plan);
            for child in plan.children.iter().rev() {
                if let ChildRef::Plan(nested) = child {
                    stack.push(nested);
                }
            }
        }
        out
    }

    /// Parses a TOML plan.
    ///
    /// # Errors
    ///
    /// The TOML error, if the text is malformed or doesn't match.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Parses a JSON plan.
    ///
    /// # Errors
    ///
    /// The JSON error, if the text is malformed or doesn't match.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// A named payload and its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadRef {
    /// Name registered with `Engine::register_payload`.
    pub name: String,
    /// Passed to the payload builder.
    #[serde(default)]
    pub config: Value,
}

/// A child entry: a key, or a nested plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildRef {
    /// Existing component, or one planned elsewhere in the tree.
    Key(String),
    /// Nested plan.
    Plan(Box<InstantiationPlan>),
}

impl ChildRef {
    /// Key of the referenced component.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Plan(plan) => &plan.key,
        }
    }
}

/// One side of a planned binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    /// Owner key. `None` means the plan declaring the binding.
    #[serde(default)]
    pub component: Option<String>,
    /// Port name.
    pub port: String,
}

impl PortRef {
    /// A port of the declaring plan.
    #[must_use]
    pub fn local(port: impl Into<String>) -> Self {
        Self {
            component: None,
            port: port.into(),
        }
    }

    /// A port of the component with `key`.
    #[must_use]
    pub fn of(key: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            component: Some(key.into()),
            port: port.into(),
        }
    }

    /// Owner key, resolving `None` to `declaring`.
    #[must_use]
    pub fn owner<'a>(&'a self, declaring: &'a str) -> &'a str {
        self.component.as_deref().unwrap_or(declaring)
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.component {
            Some(key) => write!(f, "{key}.{}", self.port),
            None => write!(f, "{}", self.port),
        }
    }
}

/// A planned binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSpec {
    /// Required side.
    pub required: PortRef,
    /// Provided side.
    pub provided: PortRef,
    /// Transport kind. Default: `local`.
    #[serde(default)]
    pub kind: BindingKind,
    /// Default: `lazy`.
    #[serde(default)]
    pub resolution: Resolution,
    /// Default: 100.
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    DEFAULT_BINDING_PRIORITY
}

impl BindingSpec {
    /// A local, lazy binding at default priority.
    #[must_use]
    pub fn new(required: PortRef, provided: PortRef) -> Self {
        Self {
            required,
            provided,
            kind: BindingKind::Local,
            resolution: Resolution::Lazy,
            priority: DEFAULT_BINDING_PRIORITY,
        }
    }

    /// Sets the kind.
    #[must_use]
    pub fn with_kind(mut self, kind: BindingKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the resolution.
    #[must_use]
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub(crate) fn options(&self) -> BindOptions {
        BindOptions::new(self.kind.clone(), self.resolution).with_priority(self.priority)
    }
}
