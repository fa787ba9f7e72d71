//! Declarative controller definitions.
//!
//! Used both inside instantiation plans and in engine configuration,
//! where they describe controllers attached to every component.
//!
//! # Example TOML
//!
//! ```toml
//! [[membrane.controllers]]
//! kind = "trace"
//! priority = 10
//!
//! [[membrane.controllers]]
//! kind = "deadline"
//! config = { limit_ms = 250 }
//! ```

use crate::ControllerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One controller to attach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSpec {
    /// Controller kind, looked up in a `ControllerCatalog`.
    pub kind: String,

    /// Priority override. `None` keeps the controller's own priority.
    #[serde(default)]
    pub priority: Option<i32>,

    /// Kind-specific configuration (a table, or absent).
    #[serde(default)]
    pub config: Value,

    /// Whether the controller starts enabled. Default: true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ControllerSpec {
    /// A spec with no configuration.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            priority: None,
            config: Value::Null,
            enabled: true,
        }
    }

    /// Sets the priority override.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Checks the shape of this spec (not whether its kind is known).
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidConfig`] if `kind` is blank or `config`
    /// is neither a table nor absent.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.kind.trim().is_empty() {
            return Err(ControllerError::InvalidConfig {
                kind: self.kind.clone(),
                reason: "kind must not be empty".into(),
            });
        }
        if !(self.config.is_null() || self.config.is_object()) {
            return Err(ControllerError::InvalidConfig {
                kind: self.kind.clone(),
                reason: "config must be a table".into(),
            });
        }
        Ok(())
    }

    /// Reads an integer config field.
    #[must_use]
    pub fn config_u64(&self, field: &str) -> Option<u64> {
        self.config.get(field).and_then(Value::as_u64)
    }

    /// Reads a string config field.
    #[must_use]
    pub fn config_str(&self, field: &str) -> Option<&str> {
        self.config.get(field).and_then(Value::as_str)
    }

    /// Reads a list of strings from a config field.
    #[must_use]
    pub fn config_strings(&self, field: &str) -> Option<Vec<String>> {
        self.config.get(field).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }
}

/// Controllers attached uniformly to every factory-built component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembraneConfig {
    /// Controller definitions, in attach order.
    pub controllers: Vec<ControllerSpec>,
}

impl MembraneConfig {
    /// Merges another layer into this one.
    ///
    /// A spec in `other` replaces an existing spec of the same kind;
    /// new kinds are appended.
    pub fn merge(&mut self, other: &Self) {
        for spec in &other.controllers {
            self.controllers.retain(|c| c.kind != spec.kind);
            self.controllers.push(spec.clone());
        }
    }

    /// Validates every spec, returning all errors.
    #[must_use]
    pub fn validate_all(&self) -> Vec<ControllerError> {
        self.controllers
            .iter()
            .filter_map(|c| c.validate().err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spec_defaults() {
        let spec: ControllerSpec = serde_json::from_str(r#"{"kind": "trace"}"#).unwrap();
        assert_eq!(spec, ControllerSpec::new("trace"));
        assert!(spec.enabled);
        assert!(spec.priority.is_none());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn spec_from_toml_table() {
        let toml_str = r#"
kind = "deadline"
priority = 5
config = { limit_ms = 250, mode = "strict" }
"#;
        let spec: ControllerSpec = toml::from_str(toml_str).unwrap();
        assert_eq!(spec.priority, Some(5));
        assert_eq!(spec.config_u64("limit_ms"), Some(250));
        assert_eq!(spec.config_str("mode"), Some("strict"));
    }

    #[test]
    fn validate_rejects_blank_kind_and_scalar_config() {
        assert!(ControllerSpec::new("  ").validate().is_err());
        let spec = ControllerSpec::new("access").with_config(json!(3));
        assert!(matches!(
            spec.validate(),
            Err(ControllerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn config_strings() {
        let spec = ControllerSpec::new("access").with_config(json!({"allow": ["get", 1, "put"]}));
        assert_eq!(
            spec.config_strings("allow"),
            Some(vec!["get".to_string(), "put".to_string()])
        );
        assert_eq!(spec.config_strings("deny"), None);
    }

    #[test]
    fn merge_overrides_by_kind() {
        let mut base = MembraneConfig {
            controllers: vec![
                ControllerSpec::new("trace"),
                ControllerSpec::new("access"),
            ],
        };
        let overlay = MembraneConfig {
            controllers: vec![
                ControllerSpec::new("trace").with_priority(1),
                ControllerSpec::new("deadline"),
            ],
        };
        base.merge(&overlay);

        let kinds: Vec<_> = base.controllers.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec!["access", "trace", "deadline"]);
        assert_eq!(base.controllers[1].priority, Some(1));
    }

    #[test]
    fn validate_all_collects() {
        let cfg = MembraneConfig {
            controllers: vec![
                ControllerSpec::new(""),
                ControllerSpec::new("ok"),
                ControllerSpec::new("bad").with_config(json!("x")),
            ],
        };
        assert_eq!(cfg.validate_all().len(), 2);
    }
}
