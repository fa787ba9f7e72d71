//! A business call travelling through membranes.

use crate::BindingKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use weft_types::{BindingId, ComponentId, PortId};

/// A call made through a required port.
///
/// Interceptors may rewrite `operation`, `args` or `metadata` before
/// passing the invocation on. The routing fields (`callee`,
/// `provided_port`, `binding`) are filled by the engine after the
/// required port resolves, and are ignored if an interceptor changes them.
///
/// `metadata` carries state from `intercept` to `complete` for the
/// same call (e.g. a start timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Requiring component. `None` for calls made directly on a provided port.
    pub caller: Option<ComponentId>,
    /// Required port the call was made through.
    pub port: Option<PortId>,
    /// Operation name.
    pub operation: String,
    /// Arguments.
    pub args: Value,
    /// Providing component.
    pub callee: ComponentId,
    /// Provided port the call resolves to.
    pub provided_port: PortId,
    /// Binding crossed, if any.
    pub binding: Option<BindingId>,
    /// Kind of the binding crossed.
    pub kind: BindingKind,
    /// Whether the caller had unsatisfied required ports at call time.
    pub caller_degraded: bool,
    /// Cross-interceptor state.
    pub metadata: BTreeMap<String, Value>,
}

impl Invocation {
    /// Creates an invocation addressed directly to a provided port.
    #[must_use]
    pub fn direct(
        callee: ComponentId,
        provided_port: PortId,
        operation: impl Into<String>,
        args: Value,
    ) -> Self {
        Self {
            caller: None,
            port: None,
            operation: operation.into(),
            args,
            callee,
            provided_port,
            binding: None,
            kind: BindingKind::Local,
            caller_degraded: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Marks the invocation as crossing `binding` from `caller`'s `port`.
    #[must_use]
    pub fn through(
        mut self,
        caller: ComponentId,
        port: PortId,
        binding: BindingId,
        kind: BindingKind,
    ) -> Self {
        self.caller = Some(caller);
        self.port = Some(port);
        self.binding = Some(binding);
        self.kind = kind;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns `true` if the call did not cross a binding.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.binding.is_none()
    }
}
