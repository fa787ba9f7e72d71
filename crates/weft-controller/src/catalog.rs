//! Controller catalog: resolves `kind` strings to controller instances.

use crate::builtin::{
    AccessController, DeadlineController, DegradationController, SnapshotController,
    SnapshotStore, TraceController,
};
use crate::{Controller, ControllerError, ControllerSpec};
use std::collections::BTreeMap;
use std::sync::Arc;

type Builder =
    Arc<dyn Fn(&ControllerSpec) -> Result<Arc<dyn Controller>, ControllerError> + Send + Sync>;

/// Maps controller kinds to builders.
///
/// # Example
///
/// ```
/// use weft_controller::{Controller, ControllerCatalog, ControllerSpec};
///
/// let catalog = ControllerCatalog::with_builtins();
/// assert!(catalog.contains("trace"));
///
/// let ctl = catalog.build(&ControllerSpec::new("access")).unwrap();
/// assert_eq!(ctl.kind(), "access");
/// assert!(catalog.build(&ControllerSpec::new("nope")).is_err());
/// ```
#[derive(Clone, Default)]
pub struct ControllerCatalog {
    builders: BTreeMap<String, Builder>,
    snapshots: SnapshotStore,
}

impl ControllerCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog with `trace`, `access`, `snapshot`, `deadline`
    /// and `degradation` registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register("trace", |spec| Ok(Arc::new(TraceController::from_spec(spec)?)));
        catalog.register("access", |spec| Ok(Arc::new(AccessController::from_spec(spec)?)));
        catalog.register("deadline", |spec| {
            Ok(Arc::new(DeadlineController::from_spec(spec)?))
        });
        catalog.register("degradation", |spec| {
            Ok(Arc::new(DegradationController::from_spec(spec)?))
        });
        let store = catalog.snapshots.clone();
        catalog.register("snapshot", move |_| {
            Ok(Arc::new(SnapshotController::new(store.clone())))
        });
        catalog
    }

    /// Registers (or replaces) the builder for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, builder: F)
    where
        F: Fn(&ControllerSpec) -> Result<Arc<dyn Controller>, ControllerError>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(kind.into(), Arc::new(builder));
    }

    /// Returns `true` if `kind` has a builder.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.builders.contains_key(kind)
    }

    /// Registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    /// Builds a controller from a spec.
    ///
    /// # Errors
    ///
    /// [`ControllerError::UnknownKind`] if no builder is registered, or
    /// whatever the builder reports for a malformed config.
    pub fn build(&self, spec: &ControllerSpec) -> Result<Arc<dyn Controller>, ControllerError> {
        spec.validate()?;
        let builder = self
            .builders
            .get(&spec.kind)
            .ok_or_else(|| ControllerError::UnknownKind {
                kind: spec.kind.clone(),
            })?;
        builder(spec)
    }

    /// Store written by `snapshot` controllers built from this catalog.
    #[must_use]
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }
}

impl std::fmt::Debug for ControllerCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerCatalog")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::MockController;
    use serde_json::json;

    #[test]
    fn builtins_registered() {
        let catalog = ControllerCatalog::with_builtins();
        assert_eq!(
            catalog.kinds(),
            vec!["access", "deadline", "degradation", "snapshot", "trace"]
        );
    }

    #[test]
    fn unknown_kind() {
        let catalog = ControllerCatalog::new();
        assert_eq!(
            catalog.build(&ControllerSpec::new("trace")).err(),
            Some(ControllerError::UnknownKind {
                kind: "trace".into()
            })
        );
    }

    #[test]
    fn builder_errors_propagate() {
        let catalog = ControllerCatalog::with_builtins();
        let spec = ControllerSpec::new("deadline").with_config(json!({"limit_ms": 0}));
        assert!(matches!(
            catalog.build(&spec),
            Err(ControllerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn custom_registration() {
        let mut catalog = ControllerCatalog::new();
        catalog.register("audit", |spec| {
            let priority = spec.priority.unwrap_or(100);
            Ok(Arc::new(MockController::new("audit").with_priority(priority)))
        });
        let ctl = catalog
            .build(&ControllerSpec::new("audit").with_priority(7))
            .unwrap();
        assert_eq!(ctl.kind(), "audit");
        assert_eq!(ctl.priority(), 7);
    }

    #[test]
    fn snapshot_controllers_share_store() {
        let catalog = ControllerCatalog::with_builtins();
        let a = catalog.build(&ControllerSpec::new("snapshot")).unwrap();
        let b = catalog.build(&ControllerSpec::new("snapshot")).unwrap();
        assert_eq!(a.kind(), b.kind());
        assert!(catalog.snapshots().is_empty());
    }
}
