//! Business payloads and remote adapters.
//!
//! A component's payload is the opaque object the engine calls once an
//! invocation has passed through every membrane. Closures work directly:
//!
//! ```
//! use weft_component::{Business, ComponentError, Invocation};
//! use weft_types::{ComponentId, PortId};
//! use serde_json::{json, Value};
//!
//! let echo = |inv: &Invocation| -> Result<Value, ComponentError> {
//!     match inv.operation.as_str() {
//!         "echo" => Ok(inv.args.clone()),
//!         other => Err(ComponentError::NotSupported(other.into())),
//!     }
//! };
//!
//! let inv = Invocation::direct(ComponentId::new(), PortId::new(), "echo", json!("hi"));
//! assert_eq!(echo.invoke(&inv).unwrap(), json!("hi"));
//! ```

use crate::{ComponentError, Invocation};
use serde_json::Value;

/// The business logic wrapped by a component.
pub trait Business: Send + Sync {
    /// Handles an invocation that reached this component's provided port.
    ///
    /// # Errors
    ///
    /// Any [`ComponentError`]; it is returned to the caller after the
    /// membrane `complete` hooks have seen it.
    fn invoke(&self, invocation: &Invocation) -> Result<Value, ComponentError>;
}

impl<F> Business for F
where
    F: Fn(&Invocation) -> Result<Value, ComponentError> + Send + Sync,
{
    fn invoke(&self, invocation: &Invocation) -> Result<Value, ComponentError> {
        self(invocation)
    }
}

/// Extension point for `remote` bindings.
///
/// The engine performs no I/O; an adapter owns whatever transport it
/// needs and is called synchronously.
pub trait RemoteAdapter: Send + Sync {
    /// Forwards a call.
    ///
    /// # Errors
    ///
    /// Transport or remote-side failures, as [`ComponentError`].
    fn invoke(&self, operation: &str, args: Value) -> Result<Value, ComponentError>;
}

/// Wraps a [`RemoteAdapter`] so it can serve as a component payload.
pub struct RemoteBusiness<A: ?Sized> {
    adapter: std::sync::Arc<A>,
}

impl<A: RemoteAdapter + ?Sized> RemoteBusiness<A> {
    /// Wraps `adapter`.
    #[must_use]
    pub fn new(adapter: std::sync::Arc<A>) -> Self {
        Self { adapter }
    }
}

impl<A: RemoteAdapter + ?Sized> Business for RemoteBusiness<A> {
    fn invoke(&self, invocation: &Invocation) -> Result<Value, ComponentError> {
        tracing::debug!(
            operation = %invocation.operation,
            callee = %invocation.callee,
            "forwarding to remote adapter"
        );
        self.adapter
            .invoke(&invocation.operation, invocation.args.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use weft_types::{ComponentId, PortId};

    struct Upper;

    impl RemoteAdapter for Upper {
        fn invoke(&self, operation: &str, args: Value) -> Result<Value, ComponentError> {
            match (operation, args.as_str()) {
                ("upper", Some(s)) => Ok(json!(s.to_uppercase())),
                ("upper", None) => Err(ComponentError::InvalidPayload("expected string".into())),
                (other, _) => Err(ComponentError::NotSupported(other.into())),
            }
        }
    }

    fn inv(op: &str, args: Value) -> Invocation {
        Invocation::direct(ComponentId::new(), PortId::new(), op, args)
    }

    #[test]
    fn remote_business_forwards() {
        let adapter: Arc<dyn RemoteAdapter> = Arc::new(Upper);
        let business = RemoteBusiness::new(adapter);
        assert_eq!(business.invoke(&inv("upper", json!("ab"))).unwrap(), json!("AB"));
        assert!(matches!(
            business.invoke(&inv("lower", json!("ab"))),
            Err(ComponentError::NotSupported(_))
        ));
    }

    #[test]
    fn closure_is_business() {
        let b: Box<dyn Business> =
            Box::new(|_: &Invocation| -> Result<Value, ComponentError> { Ok(json!(42)) });
        assert_eq!(b.invoke(&inv("any", Value::Null)).unwrap(), json!(42));
    }
}
