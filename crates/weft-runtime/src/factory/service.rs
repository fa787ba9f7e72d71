//! The factory as a component payload.

use super::InstantiationPlan;
use crate::engine::EngineInner;
use crate::Engine;
use serde_json::{json, Value};
use std::sync::Weak;
use tracing::debug;
use weft_component::{Business, ComponentError, Invocation};

/// Operation accepted on the factory port.
pub const INSTANTIATE_OPERATION: &str = "instantiate";

/// Payload of the `factory` component.
///
/// `instantiate` takes a JSON plan and answers `{"id", "key"}` of the
/// new root. The root is left unattached and NEW.
pub(crate) struct FactoryService {
    engine: Weak<EngineInner>,
}

impl FactoryService {
    pub(crate) fn new(engine: Weak<EngineInner>) -> Self {
        Self { engine }
    }
}

impl Business for FactoryService {
    fn invoke(&self, invocation: &Invocation) -> Result<Value, ComponentError> {
        if invocation.operation != INSTANTIATE_OPERATION {
            return Err(ComponentError::NotSupported(invocation.operation.clone()));
        }
        let inner = self
            .engine
            .upgrade()
            .ok_or_else(|| ComponentError::ExecutionFailed("engine dropped".into()))?;
        let plan: InstantiationPlan = serde_json::from_value(invocation.args.clone())
            .map_err(|e| ComponentError::InvalidPayload(e.to_string()))?;
        debug!(key = %plan.key, caller = ?invocation.caller, "factory instantiating");
        let id = Engine::from_inner(inner)
            .instantiate(&plan)
            .map_err(|e| ComponentError::ExecutionFailed(e.to_string()))?;
        Ok(json!({ "id": id.to_string(), "key": plan.key }))
    }
}
