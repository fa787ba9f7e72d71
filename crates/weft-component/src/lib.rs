//! Data model for the weft composition runtime.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-types      : ids, NodeKey, ErrorCode                  │
//! │  weft-component  : ports, bindings, attributes  ◄── HERE    │
//! │  weft-controller : Controller trait, Membrane chain         │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-runtime    : Engine                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate holds the plain data the engine moves around. It has no
//! locks and no graph: those live in `weft-runtime`.
//!
//! # Node Kinds
//!
//! | Type | Identity | Notes |
//! |------|----------|-------|
//! | [`Port`] | `PortId` | owned by one component |
//! | [`Binding`] | `BindingId` | required → provided, immutable record |
//! | Controller | `ControllerId` | see `weft-controller` |
//! | Component | `ComponentId` | see `weft-runtime` |
//!
//! Every node implements [`Reflective`]: a sorted attribute map with
//! reserved system keys.
//!
//! # Example
//!
//! ```
//! use weft_component::{
//!     BindOptions, Binding, BindingKind, Cardinality, ContractRegistry, Port, PortSpec,
//!     Reflective, Resolution,
//! };
//! use weft_types::ComponentId;
//!
//! let a = ComponentId::keyed("a");
//! let b = ComponentId::keyed("b");
//!
//! let r = Port::new(a, PortSpec::required("r", "X"));
//! let p = Port::new(b, PortSpec::provided("p", "X").with_cardinality(Cardinality::any()));
//!
//! let contracts = ContractRegistry::new();
//! assert!(contracts.is_compatible(p.contract(), r.contract()));
//!
//! let binding = Binding::new(
//!     r.id(),
//!     p.id(),
//!     BindOptions::new(BindingKind::Local, Resolution::Eager),
//!     0,
//! );
//! assert_eq!(binding.target(), Some(p.id()));
//! assert_eq!(binding.get("kind").unwrap(), "local");
//! ```

mod binding;
mod business;
mod contract;
mod error;
mod invocation;
mod port;
mod reflect;
mod snapshot;
mod status;

pub use binding::{BindOptions, Binding, BindingKind, Resolution, DEFAULT_BINDING_PRIORITY};
pub use business::{Business, RemoteAdapter, RemoteBusiness};
pub use contract::ContractRegistry;
pub use error::ComponentError;
pub use invocation::Invocation;
pub use port::{Cardinality, CardinalityError, Direction, Port, PortSpec};
pub use reflect::{AttributeError, Attributes, Reflective};
pub use snapshot::{ComponentSnapshot, SnapshotError, SNAPSHOT_VERSION};
pub use status::{LifecycleState, Transition};
