//! Data passed to lifecycle hooks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use weft_component::{LifecycleState, Transition};
use weft_types::ComponentId;

/// What a `before`/`after` hook sees about a pending transition.
///
/// `attributes` holds the component's user attributes at the moment the
/// chain started; system fields are exposed as typed fields instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionContext {
    /// Component being transitioned.
    pub component: ComponentId,
    /// Component name.
    pub name: String,
    /// Plan key, if the component was instantiated from a plan.
    pub key: Option<String>,
    /// Requested transition.
    pub transition: Transition,
    /// Current state.
    pub from: LifecycleState,
    /// State on commit.
    pub to: LifecycleState,
    /// Whether any required port is below its minimum.
    pub degraded: bool,
    /// User attributes.
    pub attributes: BTreeMap<String, Value>,
}

impl TransitionContext {
    /// Creates a context with no attributes.
    #[must_use]
    pub fn new(
        component: ComponentId,
        name: impl Into<String>,
        transition: Transition,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Self {
        Self {
            component,
            name: name.into(),
            key: None,
            transition,
            from,
            to,
            degraded: false,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the plan key.
    #[must_use]
    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    /// Sets the user attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: BTreeMap<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the degraded flag.
    #[must_use]
    pub fn with_degraded(mut self, degraded: bool) -> Self {
        self.degraded = degraded;
        self
    }
}

/// How a transition ended, as reported to `after` hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionOutcome {
    /// The new state was committed.
    Committed,
    /// A `before` hook vetoed.
    Vetoed {
        /// Kind of the vetoing controller.
        controller: String,
        /// Reason given.
        reason: String,
    },
    /// Every hook approved but the engine could not commit.
    Failed {
        /// Why the commit failed.
        reason: String,
    },
}

impl TransitionOutcome {
    /// Returns `true` for [`Committed`](Self::Committed).
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

impl std::fmt::Display for TransitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Committed => write!(f, "committed"),
            Self::Vetoed { controller, reason } => write!(f, "vetoed by {controller}: {reason}"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}
