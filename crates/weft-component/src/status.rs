//! Lifecycle states and transitions.
//!
//! # State Machine
//!
//! ```text
//!            Configure          Start            Stop
//!   New ─────────────► Configured ─────► Started ─────► Stopped
//!    │                     │               ▲               │
//!    │                     │               └─── Start ─────┤
//!    │  Destroy            │ Destroy                       │ Destroy
//!    └─────────────────────┴──────────────► Destroyed ◄────┘
//! ```
//!
//! Degradation is tracked separately as a flag, not a state.
//!
//! # Example
//!
//! ```
//! use weft_component::{LifecycleState, Transition};
//!
//! assert!(LifecycleState::New.allows(Transition::Configure));
//! assert!(!LifecycleState::New.allows(Transition::Start));
//! assert_eq!(
//!     LifecycleState::Stopped.apply(Transition::Start),
//!     Some(LifecycleState::Started)
//! );
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Created, not yet configured.
    #[default]
    New,
    /// Configured, ready to start.
    Configured,
    /// Serving invocations.
    Started,
    /// Stopped; may be restarted or destroyed.
    Stopped,
    /// Removed from the graph. Terminal.
    Destroyed,
}

impl LifecycleState {
    /// Returns `true` if `transition` is legal from this state.
    #[must_use]
    pub fn allows(self, transition: Transition) -> bool {
        self.apply(transition).is_some()
    }

    /// Returns the state reached by `transition`, if legal.
    #[must_use]
    pub fn apply(self, transition: Transition) -> Option<Self> {
        use LifecycleState::*;
        match (self, transition) {
            (New, Transition::Configure) => Some(Configured),
            (Configured | Stopped, Transition::Start) => Some(Started),
            (Started, Transition::Stop) => Some(Stopped),
            (New | Configured | Stopped, Transition::Destroy) => Some(Destroyed),
            _ => None,
        }
    }

    /// Returns `true` for [`Started`](Self::Started).
    #[must_use]
    pub fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }

    /// Returns `true` once configured (any state past `New`, except `Destroyed`).
    #[must_use]
    pub fn is_configured(self) -> bool {
        matches!(self, Self::Configured | Self::Started | Self::Stopped)
    }

    /// Returns `true` for [`Destroyed`](Self::Destroyed).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Configured => write!(f, "configured"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// A requested lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// `New → Configured`.
    Configure,
    /// `Configured | Stopped → Started`.
    Start,
    /// `Started → Stopped`.
    Stop,
    /// `New | Configured | Stopped → Destroyed`.
    Destroy,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configure => write!(f, "configure"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}
