//! Ports: typed, directional connection points.
//!
//! A port belongs to exactly one component. Required ports consume a
//! contract, provided ports offer one; a [`Binding`](crate::Binding)
//! always runs from a required port to a provided port.

use crate::{Attributes, Reflective};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use weft_types::{ComponentId, NodeKey, PortId};

/// Which side of a binding a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Offers a contract to others.
    Provided,
    /// Consumes a contract offered by another component.
    Required,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provided => write!(f, "provided"),
            Self::Required => write!(f, "required"),
        }
    }
}

/// Malformed cardinality bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardinalityError {
    /// `min` is greater than `max`.
    #[error("cardinality min {min} exceeds max {max}")]
    MinExceedsMax {
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
}

/// Bounds on the number of simultaneous bindings a port may hold.
///
/// Defaults to exactly one. Missing fields in a serialized form fall
/// back to the default, so `{ max = 4 }` means `(1, 4)`.
///
/// # Example
///
/// ```
/// use weft_component::Cardinality;
///
/// let c = Cardinality::new(0, 3);
/// assert!(c.validate().is_ok());
/// assert!(c.admits(0));
/// assert!(c.is_full(3));
/// assert!(c.is_multiple());
///
/// assert!(Cardinality::new(2, 1).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Cardinality {
    /// Minimum number of bindings while the owner is STARTED.
    pub min: u32,
    /// Maximum number of simultaneous bindings.
    pub max: u32,
}

impl Cardinality {
    /// Upper bound meaning "no limit".
    pub const UNBOUNDED: u32 = u32::MAX;

    /// Creates bounds without validating them.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// `(1, 1)`.
    #[must_use]
    pub const fn exactly_one() -> Self {
        Self::new(1, 1)
    }

    /// `(0, 1)`.
    #[must_use]
    pub const fn optional() -> Self {
        Self::new(0, 1)
    }

    /// `(0, unbounded)`.
    #[must_use]
    pub const fn any() -> Self {
        Self::new(0, Self::UNBOUNDED)
    }

    /// Checks that the bounds are well-formed.
    ///
    /// `(0, 0)` is well-formed: such a port exists but admits no binding.
    ///
    /// # Errors
    ///
    /// [`CardinalityError`] if `min > max`.
    pub fn validate(&self) -> Result<(), CardinalityError> {
        if self.min > self.max {
            return Err(CardinalityError::MinExceedsMax {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Returns `true` if `count` bindings satisfy the bounds.
    #[must_use]
    pub fn admits(&self, count: usize) -> bool {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        count >= self.min && count <= self.max
    }

    /// Returns `true` if no further binding fits.
    #[must_use]
    pub fn is_full(&self, count: usize) -> bool {
        u32::try_from(count).map_or(true, |c| c >= self.max)
    }

    /// Returns `true` if `count` is below the minimum.
    #[must_use]
    pub fn is_under(&self, count: usize) -> bool {
        u32::try_from(count).is_ok_and(|c| c < self.min)
    }

    /// Returns `true` if the port may resolve to more than one target.
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        self.max > 1
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::exactly_one()
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.max == Self::UNBOUNDED {
            write!(f, "({}, *)", self.min)
        } else {
            write!(f, "({}, {})", self.min, self.max)
        }
    }
}

/// Declarative description of a port, as found in an instantiation plan.
///
/// # Example TOML
///
/// ```toml
/// [[ports]]
/// name = "store"
/// direction = "required"
/// contract = "kv.store"
/// cardinality = { min = 1, max = 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name, unique within its owner.
    pub name: String,
    /// Provided or required.
    pub direction: Direction,
    /// Opaque interface identifier.
    pub contract: String,
    /// Binding count bounds.
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl PortSpec {
    /// Shorthand for a `(1, 1)` provided port.
    #[must_use]
    pub fn provided(name: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Provided,
            contract: contract.into(),
            cardinality: Cardinality::default(),
        }
    }

    /// Shorthand for a `(1, 1)` required port.
    #[must_use]
    pub fn required(name: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Required,
            contract: contract.into(),
            cardinality: Cardinality::default(),
        }
    }

    /// Overrides the cardinality.
    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }
}

/// A live port owned by one component.
///
/// Equality and hashing use the port id only.
#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,
    owner: ComponentId,
    spec: PortSpec,
    attributes: Attributes,
}

impl Port {
    /// Creates a port for `owner` and mirrors its fields as system attributes.
    #[must_use]
    pub fn new(owner: ComponentId, spec: PortSpec) -> Self {
        let id = PortId::new();
        let mut attributes = Attributes::new();
        attributes.set_system("id", json!(id.to_string()));
        attributes.set_system("owner", json!(owner.to_string()));
        attributes.set_system("name", json!(spec.name));
        attributes.set_system("direction", json!(spec.direction.to_string()));
        attributes.set_system("contract", json!(spec.contract));
        attributes.set_system(
            "cardinality",
            json!({"min": spec.cardinality.min, "max": spec.cardinality.max}),
        );
        Self {
            id,
            owner,
            spec,
            attributes,
        }
    }

    /// Port id.
    #[must_use]
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Owning component.
    #[must_use]
    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    /// Port name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.spec.direction
    }

    /// Contract identifier.
    #[must_use]
    pub fn contract(&self) -> &str {
        &self.spec.contract
    }

    /// Cardinality bounds.
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.spec.cardinality
    }

    /// The declarative spec this port was created from.
    #[must_use]
    pub fn spec(&self) -> &PortSpec {
        &self.spec
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Port {}

impl std::hash::Hash for Port {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Reflective for Port {
    fn node_key(&self) -> NodeKey {
        self.id.into()
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}
