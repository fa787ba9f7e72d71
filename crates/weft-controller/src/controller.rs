//! Controller trait and testing utilities.

use crate::{ControllerAction, InterceptAction, TransitionContext, TransitionOutcome};
use serde_json::Value;
use std::sync::Arc;
use weft_component::{ComponentError, Invocation};

/// Default controller priority.
pub const DEFAULT_CONTROLLER_PRIORITY: i32 = 100;

/// A non-functional interceptor attached to one component's membrane.
///
/// Every hook has a pass-through default, so a controller only
/// implements what it cares about.
///
/// # Ordering
///
/// Within a membrane, controllers run in ascending priority (lower =
/// earlier), FIFO among equal priorities. `after` and `complete` hooks
/// run in the reverse order of the `before`/`intercept` hooks that ran.
///
/// # Thread Safety
///
/// Controllers must be `Send + Sync`: invocations may run concurrently
/// through the same membrane.
pub trait Controller: Send + Sync {
    /// Controller kind, e.g. `"trace"`.
    ///
    /// A membrane holds at most one controller per kind unless
    /// [`multi_instance`](Self::multi_instance) returns `true`.
    fn kind(&self) -> &str;

    /// Priority (lower = earlier). Default: 100.
    fn priority(&self) -> i32 {
        DEFAULT_CONTROLLER_PRIORITY
    }

    /// Whether several instances may share one membrane. Default: `false`.
    fn multi_instance(&self) -> bool {
        false
    }

    /// Called before a transition commits. A veto aborts it.
    fn before(&self, _ctx: &TransitionContext) -> ControllerAction {
        ControllerAction::Approve
    }

    /// Called after a transition, whatever the outcome.
    fn after(&self, _ctx: &TransitionContext, _outcome: &TransitionOutcome) {}

    /// Called on the way in for every business invocation.
    fn intercept(&self, _invocation: &mut Invocation) -> InterceptAction {
        InterceptAction::Continue
    }

    /// Called on the way out with the result so far; may replace it.
    fn complete(
        &self,
        _invocation: &Invocation,
        result: Result<Value, ComponentError>,
    ) -> Result<Value, ComponentError> {
        result
    }
}

impl<C: Controller + ?Sized> Controller for Arc<C> {
    fn kind(&self) -> &str {
        (**self).kind()
    }

    fn priority(&self) -> i32 {
        (**self).priority()
    }

    fn multi_instance(&self) -> bool {
        (**self).multi_instance()
    }

    fn before(&self, ctx: &TransitionContext) -> ControllerAction {
        (**self).before(ctx)
    }

    fn after(&self, ctx: &TransitionContext, outcome: &TransitionOutcome) {
        (**self).after(ctx, outcome);
    }

    fn intercept(&self, invocation: &mut Invocation) -> InterceptAction {
        (**self).intercept(invocation)
    }

    fn complete(
        &self,
        invocation: &Invocation,
        result: Result<Value, ComponentError>,
    ) -> Result<Value, ComponentError> {
        (**self).complete(invocation, result)
    }
}

/// Test utilities for controllers.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use parking_lot::Mutex;
    use weft_component::Transition;

    /// Shared, ordered record of hook calls.
    ///
    /// Entries look like `"audit:before:start"`,
    /// `"audit:after:start:committed"`, `"audit:intercept:get"`,
    /// `"audit:complete:get"`.
    #[derive(Debug, Clone, Default)]
    pub struct CallLog {
        entries: Arc<Mutex<Vec<String>>>,
    }

    impl CallLog {
        /// Creates an empty log.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Appends an entry.
        pub fn push(&self, entry: impl Into<String>) {
            self.entries.lock().push(entry.into());
        }

        /// Returns a copy of all entries.
        #[must_use]
        pub fn entries(&self) -> Vec<String> {
            self.entries.lock().clone()
        }

        /// Returns entries containing `needle`.
        #[must_use]
        pub fn matching(&self, needle: &str) -> Vec<String> {
            self.entries
                .lock()
                .iter()
                .filter(|e| e.contains(needle))
                .cloned()
                .collect()
        }

        /// Removes all entries.
        pub fn clear(&self) {
            self.entries.lock().clear();
        }
    }

    type InterceptFn = Box<dyn Fn(&mut Invocation) -> InterceptAction + Send + Sync>;

    /// A configurable controller that records every hook call.
    pub struct MockController {
        /// Controller kind.
        pub kind: String,
        /// Priority.
        pub priority: i32,
        /// Whether several may share a membrane.
        pub multi: bool,
        /// Transition to veto, with the reason.
        pub veto_on: Option<(Transition, String)>,
        /// Invocation behaviour.
        pub intercept_fn: InterceptFn,
        /// Call record.
        pub log: CallLog,
    }

    impl MockController {
        /// Creates an approving, pass-through mock.
        #[must_use]
        pub fn new(kind: &str) -> Self {
            Self {
                kind: kind.to_string(),
                priority: DEFAULT_CONTROLLER_PRIORITY,
                multi: false,
                veto_on: None,
                intercept_fn: Box::new(|_| InterceptAction::Continue),
                log: CallLog::new(),
            }
        }

        /// Sets the priority.
        #[must_use]
        pub fn with_priority(mut self, priority: i32) -> Self {
            self.priority = priority;
            self
        }

        /// Shares `log` with other mocks.
        #[must_use]
        pub fn with_log(mut self, log: &CallLog) -> Self {
            self.log = log.clone();
            self
        }

        /// Allows several instances per membrane.
        #[must_use]
        pub fn multi(mut self) -> Self {
            self.multi = true;
            self
        }

        /// Vetoes `transition` with `reason`.
        #[must_use]
        pub fn vetoing(mut self, transition: Transition, reason: &str) -> Self {
            self.veto_on = Some((transition, reason.to_string()));
            self
        }

        /// Short-circuits every invocation with `value`.
        #[must_use]
        pub fn responding(mut self, value: Value) -> Self {
            self.intercept_fn = Box::new(move |_| InterceptAction::Respond(value.clone()));
            self
        }

        /// Short-circuits every invocation with `err`.
        #[must_use]
        pub fn failing(mut self, err: ComponentError) -> Self {
            self.intercept_fn = Box::new(move |_| InterceptAction::Fail(err.clone()));
            self
        }

        /// Rewrites invocations with `f`, then continues.
        #[must_use]
        pub fn rewriting(mut self, f: impl Fn(&mut Invocation) + Send + Sync + 'static) -> Self {
            self.intercept_fn = Box::new(move |inv| {
                f(inv);
                InterceptAction::Continue
            });
            self
        }
    }

    impl Controller for MockController {
        fn kind(&self) -> &str {
            &self.kind
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn multi_instance(&self) -> bool {
            self.multi
        }

        fn before(&self, ctx: &TransitionContext) -> ControllerAction {
            self.log
                .push(format!("{}:before:{}", self.kind, ctx.transition));
            match &self.veto_on {
                Some((t, reason)) if *t == ctx.transition => ControllerAction::veto(reason.clone()),
                _ => ControllerAction::Approve,
            }
        }

        fn after(&self, ctx: &TransitionContext, outcome: &TransitionOutcome) {
            let tag = match outcome {
                TransitionOutcome::Committed => "committed",
                TransitionOutcome::Vetoed { .. } => "vetoed",
                TransitionOutcome::Failed { .. } => "failed",
            };
            self.log
                .push(format!("{}:after:{}:{}", self.kind, ctx.transition, tag));
        }

        fn intercept(&self, invocation: &mut Invocation) -> InterceptAction {
            self.log
                .push(format!("{}:intercept:{}", self.kind, invocation.operation));
            (self.intercept_fn)(invocation)
        }

        fn complete(
            &self,
            invocation: &Invocation,
            result: Result<Value, ComponentError>,
        ) -> Result<Value, ComponentError> {
            self.log
                .push(format!("{}:complete:{}", self.kind, invocation.operation));
            result
        }
    }
}
