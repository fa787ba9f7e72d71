//! Payload catalog: resolves plan payload names to business objects.

use super::PayloadRef;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use weft_component::Business;

type Builder = Arc<dyn Fn(&Value) -> Result<Arc<dyn Business>, String> + Send + Sync>;

/// Maps payload names to builders.
///
/// A builder receives the plan's `payload.config` and returns the
/// business object, or a message explaining why the config is unusable.
#[derive(Clone, Default)]
pub struct PayloadCatalog {
    builders: BTreeMap<String, Builder>,
}

impl PayloadCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the builder for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn Business>, String> + Send + Sync + 'static,
    {
        self.builders.insert(name.into(), Arc::new(builder));
    }

    /// Returns `true` if `name` has a builder.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    /// Builds a payload.
    ///
    /// # Errors
    ///
    /// A message if the name is unknown or the builder rejects the config.
    pub fn build(&self, payload: &PayloadRef) -> Result<Arc<dyn Business>, String> {
        let builder = self
            .builders
            .get(&payload.name)
            .ok_or_else(|| format!("unknown payload '{}'", payload.name))?;
        builder(&payload.config).map_err(|e| format!("payload '{}': {e}", payload.name))
    }
}

impl std::fmt::Debug for PayloadCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCatalog")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_component::{ComponentError, Invocation};
    use weft_types::{ComponentId, PortId};

    fn constant(config: &Value) -> Result<Arc<dyn Business>, String> {
        let value = config
            .get("value")
            .cloned()
            .ok_or_else(|| "missing 'value'".to_string())?;
        Ok(Arc::new(move |_: &Invocation| -> Result<Value, ComponentError> {
            Ok(value.clone())
        }))
    }

    #[test]
    fn builds_registered_payload() {
        let mut catalog = PayloadCatalog::new();
        catalog.register("constant", constant);
        assert!(catalog.contains("constant"));
        assert_eq!(catalog.names(), vec!["constant"]);

        let payload = catalog
            .build(&PayloadRef {
                name: "constant".into(),
                config: json!({"value": 7}),
            })
            .unwrap();
        let inv = Invocation::direct(ComponentId::new(), PortId::new(), "get", json!(null));
        assert_eq!(payload.invoke(&inv).unwrap(), json!(7));
    }

    #[test]
    fn unknown_name_and_bad_config() {
        let mut catalog = PayloadCatalog::new();
        catalog.register("constant", constant);

        let unknown = catalog.build(&PayloadRef {
            name: "nope".into(),
            config: Value::Null,
        });
        assert!(unknown.err().is_some_and(|e| e.contains("unknown payload")));

        let bad = catalog.build(&PayloadRef {
            name: "constant".into(),
            config: json!({}),
        });
        assert!(bad.err().is_some_and(|e| e.contains("missing 'value'")));
    }
}
