//! Engine configuration types.

use crate::binding::SelectionPolicy;
use serde::{Deserialize, Serialize};
use weft_controller::MembraneConfig;

/// Engine configuration.
///
/// Every section defaults, so a TOML file only needs the keys it
/// changes.
///
/// # Example
///
/// ```
/// use weft_runtime::{EngineConfig, SelectionPolicy};
///
/// let config = EngineConfig::from_toml(r#"
/// [resolution]
/// policy = "round_robin"
///
/// [[membrane.controllers]]
/// kind = "trace"
/// "#).unwrap();
///
/// assert_eq!(config.resolution.policy, SelectionPolicy::RoundRobin);
/// assert!(!config.gc.auto_collect);
/// assert_eq!(config.membrane.controllers[0].kind, "trace");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Binding resolution.
    pub resolution: ResolutionConfig,
    /// Unreachable-component collection.
    pub gc: GcConfig,
    /// Controllers attached to every factory-built component.
    pub membrane: MembraneConfig,
}

impl EngineConfig {
    /// Parses from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns the TOML parse error.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serializes to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns the TOML serialization error.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Merges another layer into this one.
    ///
    /// Values in `other` that differ from the defaults override.
    pub fn merge(&mut self, other: &Self) {
        self.resolution.merge(&other.resolution);
        self.gc.merge(&other.gc);
        self.membrane.merge(&other.membrane);
    }
}

/// Resolution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Default policy for lazy resolution. Ports may override it with
    /// a `policy` attribute.
    pub policy: SelectionPolicy,
}

impl ResolutionConfig {
    fn merge(&mut self, other: &Self) {
        if other.policy != SelectionPolicy::default() {
            self.policy = other.policy;
        }
    }
}

/// Collection of unreachable components.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GcConfig {
    /// Destroy components as soon as they lose their last parent.
    pub auto_collect: bool,
}

impl GcConfig {
    fn merge(&mut self, other: &Self) {
        if other.auto_collect {
            self.auto_collect = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_controller::ControllerSpec;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = EngineConfig::default();
        config.resolution.policy = SelectionPolicy::First;
        config.gc.auto_collect = true;
        config
            .membrane
            .controllers
            .push(ControllerSpec::new("trace").with_priority(3));

        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn merge_overrides_non_defaults_only() {
        let mut base = EngineConfig::default();
        base.resolution.policy = SelectionPolicy::RoundRobin;

        let mut layer = EngineConfig::default();
        layer.gc.auto_collect = true;
        layer.membrane.controllers.push(ControllerSpec::new("access"));

        base.merge(&layer);
        assert_eq!(base.resolution.policy, SelectionPolicy::RoundRobin);
        assert!(base.gc.auto_collect);
        assert_eq!(base.membrane.controllers.len(), 1);
    }

    #[test]
    fn unknown_policy_rejected() {
        assert!(EngineConfig::from_toml("[resolution]\npolicy = \"random\"").is_err());
    }
}
