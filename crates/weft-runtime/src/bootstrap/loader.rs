//! The loader controller on the bootstrap membrane.

use super::PlanSource;
use crate::factory::InstantiationPlan;
use parking_lot::Mutex;
use tracing::{debug, info};
use weft_controller::{Controller, TransitionContext, TransitionOutcome};

/// Kind of [`LoaderController`].
pub const LOADER_KIND: &str = "loader";

/// Loads root plans and remembers which keys are loaded.
///
/// Sits on the bootstrap component's membrane, where it reports
/// bootstrap transitions together with the loaded keys.
#[derive(Debug, Default)]
pub struct LoaderController {
    loaded: Mutex<Vec<String>>,
}

impl LoaderController {
    /// Creates a loader with nothing loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a plan from `source` and records its key.
    ///
    /// # Errors
    ///
    /// The source's message.
    pub fn load(&self, source: &dyn PlanSource) -> Result<InstantiationPlan, String> {
        let plan = source.load()?;
        debug!(source = %source.describe(), key = %plan.key, "plan loaded");
        let mut loaded = self.loaded.lock();
        if !loaded.contains(&plan.key) {
            loaded.push(plan.key.clone());
        }
        Ok(plan)
    }

    /// Forgets a key. Returns `true` if it was loaded.
    pub fn forget(&self, key: &str) -> bool {
        let mut loaded = self.loaded.lock();
        let before = loaded.len();
        loaded.retain(|k| k != key);
        loaded.len() != before
    }

    /// Loaded keys, oldest first.
    #[must_use]
    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().clone()
    }
}

impl Controller for LoaderController {
    fn kind(&self) -> &str {
        LOADER_KIND
    }

    fn priority(&self) -> i32 {
        0
    }

    fn after(&self, ctx: &TransitionContext, outcome: &TransitionOutcome) {
        if outcome.is_committed() {
            info!(
                transition = %ctx.transition,
                loaded = ?self.loaded(),
                "bootstrap transition"
            );
        }
    }
}
