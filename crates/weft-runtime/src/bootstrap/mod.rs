//! Bootstrap: loading root plans under the `bootstrap` component.
//!
//! ```text
//! bootstrap ── loader controller on its membrane
//!   ├── factory
//!   ├── <root of plan 1>
//!   └── <root of plan 2>
//! ```

mod loader;
mod source;

pub use loader::{LoaderController, LOADER_KIND};
pub use source::{JsonPlanSource, PlanSource, TomlPlanSource};

use crate::{Engine, EngineError};
use std::sync::Arc;
use tracing::{info, warn};
use weft_controller::Controller;
use weft_types::ComponentId;

impl Engine {
    /// Loads a root plan, instantiates it under `bootstrap` and starts it.
    ///
    /// The first call starts `bootstrap` itself, which starts everything
    /// below it; later calls start only the new root. On failure the new
    /// root is detached and collected.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidPlan`] if the source fails or the plan is invalid
    /// - [`EngineError::CycleDetected`] for looping key references
    /// - [`EngineError::TransitionRejected`] if a start is vetoed or a
    ///   required port is unsatisfied
    /// - binding errors raised while instantiating
    pub fn bootstrap(&self, source: &dyn PlanSource) -> Result<ComponentId, EngineError> {
        let boot = self.bootstrap_id();
        self.ensure_loader(boot)?;

        let plan = self
            .inner
            .loader
            .load(source)
            .map_err(EngineError::InvalidPlan)?;
        let root = match self.instantiate(&plan) {
            Ok(root) => root,
            Err(e) => {
                self.inner.loader.forget(&plan.key);
                return Err(e);
            }
        };

        let already_loaded = self.children(boot)?.contains(&root);
        let started = self.attach(boot, root).and_then(|()| {
            if self.state(boot)?.is_started() {
                self.start(root)
            } else {
                self.start(boot)
            }
        });

        if let Err(e) = started {
            warn!(key = %plan.key, error = %e, "bootstrap failed");
            if !already_loaded {
                self.abandon(boot, root, &plan.key);
            }
            return Err(e);
        }
        info!(key = %plan.key, root = %root, source = %source.describe(), "plan bootstrapped");
        Ok(root)
    }

    /// Detaches a loaded root from `bootstrap` and collects it.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if no loaded root has this key.
    pub fn unload(&self, key: &str) -> Result<(), EngineError> {
        let boot = self.bootstrap_id();
        let root = self
            .find_by_key(key)
            .filter(|id| self.cell(boot).is_ok_and(|b| b.children().contains(id)))
            .ok_or_else(|| EngineError::not_found(format!("loaded plan '{key}'")))?;
        self.detach(boot, root)?;
        let collected = self.collect_garbage();
        self.inner.loader.forget(key);
        info!(key, collected = collected.len(), "plan unloaded");
        Ok(())
    }

    /// Keys of the plans loaded through [`Engine::bootstrap`].
    #[must_use]
    pub fn loaded_plans(&self) -> Vec<String> {
        self.inner.loader.loaded()
    }

    fn ensure_loader(&self, boot: ComponentId) -> Result<(), EngineError> {
        let present = self
            .cell(boot)?
            .node
            .read()
            .membrane
            .by_kind(LOADER_KIND)
            .is_some();
        if !present {
            let loader: Arc<dyn Controller> = self.inner.loader.clone();
            self.attach_controller(boot, loader)?;
        }
        Ok(())
    }

    fn abandon(&self, boot: ComponentId, root: ComponentId, key: &str) {
        let _ = self.detach(boot, root);
        if self.parents(root).is_ok_and(|p| p.is_empty()) {
            self.queue_unreachable(root);
        }
        self.collect_garbage();
        self.inner.loader.forget(key);
    }
}
