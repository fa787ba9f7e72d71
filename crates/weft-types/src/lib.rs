//! Core types for weft.
//!
//! This crate provides the identifier types shared by every layer of the
//! weft composition runtime, plus the [`ErrorCode`] convention.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-types      : ids, NodeKey, ErrorCode       ◄── HERE   │
//! │  weft-component  : ports, bindings, attributes, states      │
//! │  weft-controller : Controller trait, Membrane chain         │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-runtime    : Engine (graph, resolver, lifecycle,      │
//! │                    factory, bootstrap)                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identity
//!
//! Nodes are stored in identity-keyed maps while their attributes
//! mutate, so every node type compares and hashes by its id:
//!
//! - [`ComponentId`]: random, or deterministic from a plan key
//! - [`PortId`], [`BindingId`], [`ControllerId`]: random
//! - [`NodeKey`]: any of the above, used by the uniform attribute API
//!
//! # Example
//!
//! ```
//! use weft_types::{ComponentId, NodeKey, PortId};
//!
//! let svc = ComponentId::keyed("svc");
//! let port = PortId::new();
//!
//! let keys = [NodeKey::from(svc), NodeKey::from(port)];
//! assert_eq!(keys[0].kind(), "component");
//! assert_eq!(keys[1].kind(), "port");
//! ```

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{BindingId, ComponentId, ControllerId, NodeKey, PortId};
