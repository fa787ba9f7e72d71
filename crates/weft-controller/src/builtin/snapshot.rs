//! `snapshot`: captures user attributes before a component stops.

use crate::{Controller, ControllerAction, TransitionContext};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use weft_component::{ComponentSnapshot, Transition};
use weft_types::ComponentId;

/// Latest snapshot per component, shared between controllers.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<Mutex<BTreeMap<ComponentId, ComponentSnapshot>>>,
}

impl SnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot of `component`.
    #[must_use]
    pub fn latest(&self, component: ComponentId) -> Option<ComponentSnapshot> {
        self.inner.lock().get(&component).cloned()
    }

    /// Number of components with a snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn put(&self, snapshot: ComponentSnapshot) {
        self.inner.lock().insert(snapshot.component, snapshot);
    }
}

/// Captures a [`ComponentSnapshot`] in the `before` hook of STOP and
/// DESTROY transitions. Never vetoes.
#[derive(Debug, Clone, Default)]
pub struct SnapshotController {
    store: SnapshotStore,
}

impl SnapshotController {
    /// Writes into `store`.
    #[must_use]
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }
}

impl Controller for SnapshotController {
    fn kind(&self) -> &str {
        "snapshot"
    }

    fn before(&self, ctx: &TransitionContext) -> ControllerAction {
        if matches!(ctx.transition, Transition::Stop | Transition::Destroy) {
            tracing::debug!(component = %ctx.component, transition = %ctx.transition, "capturing snapshot");
            self.store.put(ComponentSnapshot::capture(
                ctx.component,
                ctx.from,
                ctx.attributes.clone(),
            ));
        }
        ControllerAction::Approve
    }
}
