//! Uniform attribute protocol over every node kind.

use super::{Engine, EngineError};
use serde_json::Value;
use weft_component::{AttributeError, Reflective};
use weft_types::{ComponentId, ControllerId, NodeKey};

impl Engine {
    /// Reads an attribute of any node.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the node or key does not exist.
    pub fn attribute(&self, node: NodeKey, key: &str) -> Result<Value, EngineError> {
        self.visit(node, |r| r.get(key).cloned())
    }

    /// Writes a user attribute, returning the previous value.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the node does not exist,
    /// [`EngineError::ReservedAttribute`] for system attributes.
    pub fn set_attribute(
        &self,
        node: NodeKey,
        key: &str,
        value: Value,
    ) -> Result<Option<Value>, EngineError> {
        self.visit_mut(node, |r| r.set(key, value))
    }

    /// Removes a user attribute, returning its value.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the node or key does not exist,
    /// [`EngineError::ReservedAttribute`] for system attributes.
    pub fn delete_attribute(&self, node: NodeKey, key: &str) -> Result<Value, EngineError> {
        self.visit_mut(node, |r| r.delete(key))
    }

    /// Every attribute key of a node, sorted, system keys included.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the node does not exist.
    pub fn attribute_keys(&self, node: NodeKey) -> Result<Vec<String>, EngineError> {
        self.visit(node, |r| Ok(r.keys()))
    }

    fn visit<R>(
        &self,
        node: NodeKey,
        f: impl FnOnce(&dyn Reflective) -> Result<R, AttributeError>,
    ) -> Result<R, EngineError> {
        let result = match node {
            NodeKey::Component(id) => f(&*self.cell(id)?.node.read()),
            NodeKey::Port(id) => f(&*self.port_cell(id)?.port.read()),
            NodeKey::Binding(id) => f(&self.binding(id)?),
            NodeKey::Controller(id) => {
                let cell = self.cell(self.controller_owner(id)?)?;
                let node = cell.node.read();
                let slot = node
                    .membrane
                    .get(id)
                    .ok_or_else(|| EngineError::not_found(id))?;
                f(slot)
            }
        };
        result.map_err(|e| EngineError::attribute(node, e))
    }

    fn visit_mut<R>(
        &self,
        node: NodeKey,
        f: impl FnOnce(&mut dyn Reflective) -> Result<R, AttributeError>,
    ) -> Result<R, EngineError> {
        let result = match node {
            NodeKey::Component(id) => f(&mut *self.cell(id)?.node.write()),
            NodeKey::Port(id) => f(&mut *self.port_cell(id)?.port.write()),
            NodeKey::Binding(id) => self.with_binding_mut(id, |b| f(b))?,
            NodeKey::Controller(id) => {
                let cell = self.cell(self.controller_owner(id)?)?;
                let mut node = cell.node.write();
                let slot = node
                    .membrane
                    .get_mut(id)
                    .ok_or_else(|| EngineError::not_found(id))?;
                f(slot)
            }
        };
        result.map_err(|e| EngineError::attribute(node, e))
    }

    fn controller_owner(&self, id: ControllerId) -> Result<ComponentId, EngineError> {
        self.inner
            .controllers
            .read()
            .get(&id)
            .copied()
            .ok_or_else(|| EngineError::not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_component::{BindingKind, PortSpec, Resolution};
    use weft_controller::builtin::TraceController;
    use std::sync::Arc;

    #[test]
    fn component_attributes() {
        let engine = Engine::new();
        let c = engine.create_component("svc");
        let key = NodeKey::from(c);

        assert_eq!(engine.attribute(key, "name").unwrap(), json!("svc"));
        assert_eq!(engine.attribute(key, "state").unwrap(), json!("new"));
        assert!(matches!(
            engine.attribute(key, "color"),
            Err(EngineError::NotFound(_))
        ));

        assert_eq!(engine.set_attribute(key, "color", json!("red")).unwrap(), None);
        assert_eq!(
            engine.set_attribute(key, "color", json!("blue")).unwrap(),
            Some(json!("red"))
        );
        assert!(matches!(
            engine.set_attribute(key, "state", json!("started")),
            Err(EngineError::ReservedAttribute { .. })
        ));
        assert!(matches!(
            engine.delete_attribute(key, "name"),
            Err(EngineError::ReservedAttribute { .. })
        ));

        let keys = engine.attribute_keys(key).unwrap();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(keys.contains(&"color".to_string()));

        assert_eq!(engine.delete_attribute(key, "color").unwrap(), json!("blue"));
        assert!(engine.delete_attribute(key, "color").is_err());
        assert_eq!(engine.view(c).unwrap().attribute("color"), None);
    }

    #[test]
    fn port_binding_and_controller_attributes() {
        let engine = Engine::new();
        let a = engine.create_component("a");
        let b = engine.create_component("b");
        let r = engine.add_port(a, PortSpec::required("r", "X")).unwrap();
        let p = engine.add_port(b, PortSpec::provided("p", "X")).unwrap();
        let bind = engine
            .bind(r, p, BindingKind::Remote, Resolution::Lazy)
            .unwrap();
        let ctl = engine
            .attach_controller(a, Arc::new(TraceController::default()))
            .unwrap();

        assert_eq!(engine.attribute(r.into(), "contract").unwrap(), json!("X"));
        assert_eq!(engine.attribute(r.into(), "direction").unwrap(), json!("required"));
        assert_eq!(engine.attribute(bind.into(), "kind").unwrap(), json!("remote"));
        assert_eq!(engine.attribute(ctl.into(), "kind").unwrap(), json!("trace"));

        engine
            .set_attribute(bind.into(), "weight", json!(3))
            .unwrap();
        assert_eq!(engine.binding(bind).unwrap().get("weight").unwrap(), &json!(3));
        assert!(engine
            .set_attribute(bind.into(), "provided", json!("x"))
            .is_err());

        engine.set_attribute(ctl.into(), "note", json!("hi")).unwrap();
        assert_eq!(engine.attribute(ctl.into(), "note").unwrap(), json!("hi"));
    }

    #[test]
    fn unknown_nodes_not_found() {
        let engine = Engine::new();
        for key in [
            NodeKey::from(ComponentId::new()),
            NodeKey::from(weft_types::PortId::new()),
            NodeKey::from(weft_types::BindingId::new()),
            NodeKey::from(ControllerId::new()),
        ] {
            assert!(matches!(
                engine.attribute(key, "id"),
                Err(EngineError::NotFound(_))
            ));
        }
    }
}
