//! Point-in-time captures of a component's user attributes.
//!
//! Taken by the `snapshot` controller before a component stops, so a
//! monitoring or persistence layer can read what the component looked
//! like when it went down.
//!
//! # Example
//!
//! ```
//! use weft_component::{ComponentSnapshot, LifecycleState};
//! use weft_types::ComponentId;
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! let id = ComponentId::keyed("cache");
//! let mut attrs = BTreeMap::new();
//! attrs.insert("entries".to_string(), json!(12));
//!
//! let snap = ComponentSnapshot::capture(id, LifecycleState::Started, attrs);
//! assert!(snap.validate(id).is_ok());
//! assert_eq!(snap.attribute("entries"), Some(&json!(12)));
//! ```

use crate::LifecycleState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use weft_types::ComponentId;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors from snapshot handling.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// (De)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot version mismatch.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found in the snapshot.
        actual: u32,
    },

    /// Snapshot belongs to a different component.
    #[error("component mismatch: expected {expected}, got {actual}")]
    ComponentMismatch {
        /// Component the caller asked about.
        expected: ComponentId,
        /// Component recorded in the snapshot.
        actual: ComponentId,
    },
}

/// Captured user attributes of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    /// Component the snapshot was taken from.
    pub component: ComponentId,
    /// Format version.
    pub version: u32,
    /// State at capture time.
    pub state: LifecycleState,
    /// User attributes at capture time.
    pub attributes: BTreeMap<String, Value>,
}

impl ComponentSnapshot {
    /// Captures `attributes` for `component`.
    #[must_use]
    pub fn capture(
        component: ComponentId,
        state: LifecycleState,
        attributes: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            component,
            version: SNAPSHOT_VERSION,
            state,
            attributes,
        }
    }

    /// Returns a captured attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Serializes to JSON.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Serialization`] on failure.
    pub fn to_json(&self) -> Result<Value, SnapshotError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Deserializes from JSON.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Serialization`] on malformed input.
    pub fn from_json(value: Value) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Checks that this snapshot belongs to `expected` and has the
    /// current format version.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::ComponentMismatch`] or [`SnapshotError::VersionMismatch`].
    pub fn validate(&self, expected: ComponentId) -> Result<(), SnapshotError> {
        if self.component != expected {
            return Err(SnapshotError::ComponentMismatch {
                expected,
                actual: self.component,
            });
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                actual: self.version,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_roundtrip() {
        let id = ComponentId::new();
        let mut attrs = BTreeMap::new();
        attrs.insert("k".into(), json!([1, 2]));
        let snap = ComponentSnapshot::capture(id, LifecycleState::Started, attrs);
        let back = ComponentSnapshot::from_json(snap.to_json().unwrap()).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn validate_rejects_other_component() {
        let snap = ComponentSnapshot::capture(
            ComponentId::new(),
            LifecycleState::Started,
            BTreeMap::new(),
        );
        assert!(matches!(
            snap.validate(ComponentId::new()),
            Err(SnapshotError::ComponentMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_future_version() {
        let id = ComponentId::new();
        let mut snap = ComponentSnapshot::capture(id, LifecycleState::Stopped, BTreeMap::new());
        snap.version = SNAPSHOT_VERSION + 1;
        assert!(matches!(
            snap.validate(id),
            Err(SnapshotError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            ComponentSnapshot::from_json(json!({"nope": true})),
            Err(SnapshotError::Serialization(_))
        ));
    }
}
