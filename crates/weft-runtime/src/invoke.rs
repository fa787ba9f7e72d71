//! Business invocation dispatch.
//!
//! A call through a required port crosses two membranes before it reaches
//! a payload:
//!
//! ```text
//! caller intercepts ─► provider intercepts ─► payload
//! caller completes  ◄─ provider completes  ◄──┘
//! ```
//!
//! The provider's invocation gate is held for read while the call is
//! inside it, so a transition of the provider waits for in-flight calls,
//! and calls arriving during a transition wait for it. A payload must not
//! transition its own component.

use crate::binding::Target;
use crate::{Engine, EngineError};
use serde_json::Value;
use tracing::debug;
use weft_component::{ComponentError, Direction, Invocation};
use weft_controller::Chain;
use weft_types::{ComponentId, PortId};

struct Caller {
    component: ComponentId,
    port: PortId,
    degraded: bool,
    chain: Chain,
}

impl Engine {
    /// Calls `operation` on the provider behind a required port.
    ///
    /// For a multi-valued port the first target in policy order is
    /// called; see [`Engine::invoke_all`] for fan-out.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the component or port does not exist
    /// - [`EngineError::DirectionMismatch`] if the port is provided
    /// - [`EngineError::Unbound`] if nothing is bound
    /// - [`EngineError::Unavailable`] if the provider is not STARTED
    /// - [`EngineError::Invocation`] if an interceptor or the payload fails
    pub fn invoke(
        &self,
        component: ComponentId,
        port: &str,
        operation: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        let caller = self.caller(component, port)?;
        let resolved = self.resolve(caller.port)?;
        let target = resolved.first().ok_or_else(|| EngineError::Unbound {
            port: port.to_string(),
        })?;
        self.dispatch(target.component, target.port, Some((&caller, target)), operation, args)
    }

    /// Calls `operation` on every provider behind a required port, in
    /// policy order. Stops at the first failure.
    ///
    /// # Errors
    ///
    /// As [`Engine::invoke`], for the first failing target.
    pub fn invoke_all(
        &self,
        component: ComponentId,
        port: &str,
        operation: &str,
        args: Value,
    ) -> Result<Vec<Value>, EngineError> {
        let caller = self.caller(component, port)?;
        self.resolve(caller.port)?
            .into_targets()
            .iter()
            .map(|target| {
                self.dispatch(
                    target.component,
                    target.port,
                    Some((&caller, target)),
                    operation,
                    args.clone(),
                )
            })
            .collect()
    }

    /// Calls `operation` directly on one of the component's provided
    /// ports. Only the component's own membrane is crossed.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the component or port does not exist
    /// - [`EngineError::DirectionMismatch`] if the port is required
    /// - [`EngineError::Unavailable`] if the component is not STARTED
    /// - [`EngineError::Invocation`] if an interceptor or the payload fails
    pub fn invoke_provided(
        &self,
        component: ComponentId,
        port: &str,
        operation: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        let port_id = self.port(component, port)?;
        let cell = self.port_cell(port_id)?;
        if cell.direction() != Direction::Provided {
            return Err(EngineError::DirectionMismatch {
                port: port.to_string(),
                expected: Direction::Provided,
            });
        }
        self.dispatch(component, port_id, None, operation, args)
    }

    fn caller(&self, component: ComponentId, port: &str) -> Result<Caller, EngineError> {
        let cell = self.cell(component)?;
        let (port_id, degraded, chain) = {
            let node = cell.node.read();
            let port_id = node
                .port(port)
                .ok_or_else(|| EngineError::not_found(format!("port '{port}' on {component}")))?;
            (port_id, !node.degraded.is_empty(), node.membrane.chain())
        };
        if self.port_cell(port_id)?.direction() != Direction::Required {
            return Err(EngineError::DirectionMismatch {
                port: port.to_string(),
                expected: Direction::Required,
            });
        }
        Ok(Caller {
            component,
            port: port_id,
            degraded,
            chain,
        })
    }

    fn dispatch(
        &self,
        callee: ComponentId,
        provided: PortId,
        through: Option<(&Caller, &Target)>,
        operation: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        let provider = self.cell(callee)?;
        let _gate = provider.gate.read_recursive();
        let (state, provider_chain) = {
            let node = provider.node.read();
            (node.state, node.membrane.chain())
        };
        if !state.is_started() {
            return Err(EngineError::Unavailable {
                component: callee,
                state,
            });
        }

        let mut invocation = Invocation::direct(callee, provided, operation, args);
        let chain = match through {
            Some((caller, target)) => {
                invocation = invocation.through(
                    caller.component,
                    caller.port,
                    target.binding,
                    target.kind.clone(),
                );
                invocation.caller_degraded = caller.degraded;
                caller.chain.clone().then(provider_chain)
            }
            None => provider_chain,
        };

        debug!(
            callee = %callee,
            port = %provided,
            operation,
            kind = %invocation.kind,
            "invoking"
        );
        let payload = provider.payload.clone();
        chain
            .run_invocation(invocation, |inv| match &payload {
                Some(business) => business.invoke(inv),
                None => Err(ComponentError::NotSupported(format!(
                    "{} has no payload",
                    inv.callee
                ))),
            })
            .map_err(EngineError::from)
    }
}
