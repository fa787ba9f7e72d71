//! Composition engine for weft.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-types      : ids, NodeKey, ErrorCode                  │
//! │  weft-component  : ports, bindings, attributes, states      │
//! │  weft-controller : Controller, Membrane, Catalog            │
//! └─────────────────────────────────────────────────────────────┘
//!           ↕
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-runtime    : Engine ◄── HERE                          │
//! │    graph      attach / detach / find / collect_garbage      │
//! │    binding    bind / resolve / rebind / unbind              │
//! │    lifecycle  configure / start / stop / destroy            │
//! │    invoke     calls through both membranes                  │
//! │    factory    instantiate plans                             │
//! │    bootstrap  load root plans under `bootstrap`             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Overview
//!
//! Components form a containment DAG: a component may be shared by
//! several parents, and attaching never creates a cycle. Required ports
//! are bound to provided ports whose contract satisfies theirs, within
//! the port cardinalities. Every lifecycle transition and every call
//! crosses the membrane of the component it touches.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use std::sync::Arc;
//! use weft_component::{BindingKind, ComponentError, Invocation, PortSpec, Resolution};
//! use weft_runtime::Engine;
//!
//! let engine = Engine::new();
//! let greet = |inv: &Invocation| -> Result<serde_json::Value, ComponentError> {
//!     Ok(json!(format!("hello, {}", inv.args)))
//! };
//! let server = engine.create_component_with("server", Arc::new(greet));
//! let client = engine.create_component("client");
//! let p = engine.add_port(server, PortSpec::provided("greet", "Greeter")).unwrap();
//! let r = engine.add_port(client, PortSpec::required("greet", "Greeter")).unwrap();
//!
//! engine.bind(r, p, BindingKind::Local, Resolution::Lazy).unwrap();
//! engine.start(server).unwrap();
//! engine.start(client).unwrap();
//!
//! let out = engine.invoke(client, "greet", "hello", json!("bob")).unwrap();
//! assert_eq!(out, json!("hello, \"bob\""));
//! ```

mod binding;
mod bootstrap;
mod config;
mod engine;
mod factory;
mod graph;
mod invoke;
mod lifecycle;
mod remote;

pub use binding::{Resolved, SelectionPolicy, Target, POLICY_ATTRIBUTE};
pub use bootstrap::{JsonPlanSource, LoaderController, PlanSource, TomlPlanSource, LOADER_KIND};
pub use config::{ConfigError, ConfigLoader, EngineConfig, GcConfig, ResolutionConfig};
pub use engine::{ComponentView, Engine, EngineError};
pub use factory::{
    BindingSpec, ChildRef, InstantiationPlan, PayloadCatalog, PayloadRef, PortRef, BOOTSTRAP_KEY,
    FACTORY_CONTRACT, FACTORY_KEY, FACTORY_PORT, INSTANTIATE_OPERATION,
};
pub use graph::Traversal;
pub use remote::REMOTE_PORT;
