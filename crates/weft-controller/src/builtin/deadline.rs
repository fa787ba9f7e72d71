//! `deadline`: fails invocations that ran past a time limit.
//!
//! The engine has no cancellation primitive, so the check happens when
//! the call completes: a result that arrives too late is replaced with
//! [`ComponentError::DeadlineExceeded`].

use crate::{Controller, ControllerError, ControllerSpec, InterceptAction};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use weft_component::{ComponentError, Invocation};

const STARTED_KEY: &str = "deadline.started_us";

/// Enforces a per-invocation time limit.
#[derive(Debug, Clone)]
pub struct DeadlineController {
    limit: Duration,
    epoch: Instant,
}

impl DeadlineController {
    /// Creates a controller with the given limit.
    #[must_use]
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            epoch: Instant::now(),
        }
    }

    /// Builds from a spec. Config: `limit_ms` (required, > 0).
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidConfig`] if `limit_ms` is missing or zero.
    pub fn from_spec(spec: &ControllerSpec) -> Result<Self, ControllerError> {
        match spec.config_u64("limit_ms") {
            Some(ms) if ms > 0 => Ok(Self::new(Duration::from_millis(ms))),
            _ => Err(ControllerError::InvalidConfig {
                kind: spec.kind.clone(),
                reason: "limit_ms must be a positive integer".into(),
            }),
        }
    }

    /// Configured limit.
    #[must_use]
    pub fn limit(&self) -> Duration {
        self.limit
    }

    fn now_us(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

impl Controller for DeadlineController {
    fn kind(&self) -> &str {
        "deadline"
    }

    fn priority(&self) -> i32 {
        5
    }

    fn intercept(&self, invocation: &mut Invocation) -> InterceptAction {
        invocation
            .metadata
            .insert(STARTED_KEY.to_string(), json!(self.now_us()));
        InterceptAction::Continue
    }

    fn complete(
        &self,
        invocation: &Invocation,
        result: Result<Value, ComponentError>,
    ) -> Result<Value, ComponentError> {
        let Some(started) = invocation.metadata.get(STARTED_KEY).and_then(Value::as_u64) else {
            return result;
        };
        let elapsed = Duration::from_micros(self.now_us().saturating_sub(started));
        if elapsed > self.limit {
            let limit_ms = u64::try_from(self.limit.as_millis()).unwrap_or(u64::MAX);
            let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(
                operation = %invocation.operation,
                callee = %invocation.callee,
                limit_ms,
                elapsed_ms,
                "invocation exceeded deadline"
            );
            return Err(ComponentError::DeadlineExceeded {
                limit_ms,
                elapsed_ms,
            });
        }
        result
    }
}
