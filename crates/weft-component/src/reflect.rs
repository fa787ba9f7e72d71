//! Uniform attribute protocol shared by every graph node.
//!
//! Components, ports, bindings and controllers all carry an
//! [`Attributes`] map and expose it through the [`Reflective`] trait.
//! The engine mirrors system fields (a port's `direction`, a component's
//! `state`, ...) into the map as *reserved* keys: they are readable like
//! any other attribute but cannot be overwritten or removed through the
//! public protocol.
//!
//! # Example
//!
//! ```
//! use weft_component::{AttributeError, Attributes};
//! use serde_json::json;
//!
//! let mut attrs = Attributes::new();
//! attrs.set_system("name", json!("db"));
//! attrs.set("pool_size", json!(8)).unwrap();
//!
//! assert_eq!(attrs.get("pool_size").unwrap(), &json!(8));
//! assert_eq!(attrs.keys(), vec!["name", "pool_size"]);
//! assert!(matches!(
//!     attrs.set("name", json!("other")),
//!     Err(AttributeError::Reserved { .. })
//! ));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use weft_types::{ErrorCode, NodeKey};

/// Errors from the attribute protocol.
///
/// | Error | Code | Recoverable |
/// |-------|------|-------------|
/// | [`NotFound`](AttributeError::NotFound) | `ATTR_NOT_FOUND` | No |
/// | [`Reserved`](AttributeError::Reserved) | `ATTR_RESERVED` | No |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum AttributeError {
    /// The key is not present.
    #[error("attribute not found: {key}")]
    NotFound {
        /// Missing key.
        key: String,
    },

    /// The key names a system attribute.
    #[error("attribute is reserved: {key}")]
    Reserved {
        /// Reserved key.
        key: String,
    },
}

impl ErrorCode for AttributeError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "ATTR_NOT_FOUND",
            Self::Reserved { .. } => "ATTR_RESERVED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Attribute map of a single node.
///
/// Keys enumerate in sorted order. Values are untyped JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    values: BTreeMap<String, Value>,
    reserved: BTreeSet<String>,
}

impl Attributes {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map holding only user attributes.
    #[must_use]
    pub fn from_user(values: BTreeMap<String, Value>) -> Self {
        Self {
            values,
            reserved: BTreeSet::new(),
        }
    }

    /// Returns the value for `key`.
    ///
    /// # Errors
    ///
    /// [`AttributeError::NotFound`] if absent.
    pub fn get(&self, key: &str) -> Result<&Value, AttributeError> {
        self.values.get(key).ok_or_else(|| AttributeError::NotFound {
            key: key.to_string(),
        })
    }

    /// Sets a user attribute, returning the previous value.
    ///
    /// # Errors
    ///
    /// [`AttributeError::Reserved`] if `key` is a system attribute.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, AttributeError> {
        let key = key.into();
        if self.reserved.contains(&key) {
            return Err(AttributeError::Reserved { key });
        }
        Ok(self.values.insert(key, value))
    }

    /// Removes a user attribute, returning its value.
    ///
    /// # Errors
    ///
    /// [`AttributeError::Reserved`] for system attributes,
    /// [`AttributeError::NotFound`] if absent.
    pub fn delete(&mut self, key: &str) -> Result<Value, AttributeError> {
        if self.reserved.contains(key) {
            return Err(AttributeError::Reserved {
                key: key.to_string(),
            });
        }
        self.values.remove(key).ok_or_else(|| AttributeError::NotFound {
            key: key.to_string(),
        })
    }

    /// Returns all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns `true` if `key` is a system attribute.
    #[must_use]
    pub fn is_reserved(&self, key: &str) -> bool {
        self.reserved.contains(key)
    }

    /// Writes a system attribute, bypassing the reserved check.
    ///
    /// Engine-only: the key becomes reserved for the public protocol.
    pub fn set_system(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.reserved.insert(key.clone());
        self.values.insert(key, value);
    }

    /// Returns user (non-reserved) attributes.
    #[must_use]
    pub fn user(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .filter(|(k, _)| !self.reserved.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns every attribute, system ones included.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.values.clone()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A node that takes part in the uniform attribute protocol.
///
/// Implementors provide identity and access to their [`Attributes`];
/// `get`/`set`/`delete`/`keys` come for free.
pub trait Reflective {
    /// Stable identity of this node.
    fn node_key(&self) -> NodeKey;

    /// Attribute map.
    fn attributes(&self) -> &Attributes;

    /// Mutable attribute map.
    fn attributes_mut(&mut self) -> &mut Attributes;

    /// See [`Attributes::get`].
    fn get(&self, key: &str) -> Result<&Value, AttributeError> {
        self.attributes().get(key)
    }

    /// See [`Attributes::set`].
    fn set(&mut self, key: &str, value: Value) -> Result<Option<Value>, AttributeError> {
        self.attributes_mut().set(key, value)
    }

    /// See [`Attributes::delete`].
    fn delete(&mut self, key: &str) -> Result<Value, AttributeError> {
        self.attributes_mut().delete(key)
    }

    /// See [`Attributes::keys`].
    fn keys(&self) -> Vec<String> {
        self.attributes().keys()
    }
}
