//! Controllers and membranes for weft.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-types      : ids, NodeKey, ErrorCode                  │
//! │  weft-component  : ports, bindings, attributes, states      │
//! └─────────────────────────────────────────────────────────────┘
//!           ↕ depends on the data model, depended on by the engine
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-controller : Controller, Membrane, Catalog ◄── HERE   │
//! └─────────────────────────────────────────────────────────────┘
//!           ↕
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-runtime    : Engine                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Overview
//!
//! A controller is a non-functional interceptor attached to one
//! component. The ordered set of controllers on a component is its
//! [`Membrane`]. Lifecycle transitions and business invocations both
//! pass through it:
//!
//! ```text
//!   before (asc) ──► commit ──► after (desc)
//!   intercept (asc) ──► payload ──► complete (desc)
//! ```
//!
//! Any `before` may veto; any `intercept` may answer or fail the call.
//! The unwinding half always runs for every controller whose entry hook
//! ran.
//!
//! ## Declarative controllers
//!
//! [`ControllerSpec`] describes a controller by kind, priority and a
//! config table; [`ControllerCatalog`] turns specs into instances. The
//! catalog ships with the kinds in [`builtin`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use weft_component::{LifecycleState, Transition};
//! use weft_controller::builtin::TraceController;
//! use weft_controller::{Membrane, TransitionContext};
//! use weft_types::ComponentId;
//!
//! let mut membrane = Membrane::new();
//! membrane.attach(Arc::new(TraceController::default())).unwrap();
//!
//! let ctx = TransitionContext::new(
//!     ComponentId::new(),
//!     "svc",
//!     Transition::Configure,
//!     LifecycleState::New,
//!     LifecycleState::Configured,
//! );
//! let outcome = membrane.chain().run_transition(&ctx, || Ok(()));
//! assert!(outcome.is_committed());
//! ```

mod action;
pub mod builtin;
mod catalog;
mod config;
mod context;
mod controller;
mod error;
mod membrane;

pub use action::{ControllerAction, InterceptAction};
pub use catalog::ControllerCatalog;
pub use config::{ControllerSpec, MembraneConfig};
pub use context::{TransitionContext, TransitionOutcome};
pub use controller::{Controller, DEFAULT_CONTROLLER_PRIORITY};
pub use error::ControllerError;
pub use membrane::{Chain, ControllerSlot, Membrane};

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Test utilities for controllers.
    //!
    //! Provides [`MockController`] and [`CallLog`].
    pub use crate::controller::testing::{CallLog, MockController};
}
