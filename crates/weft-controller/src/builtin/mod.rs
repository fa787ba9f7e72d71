//! Builtin controller kinds.
//!
//! | Kind | Default priority | Hooks |
//! |------|------------------|-------|
//! | `trace` | 0 | all |
//! | `deadline` | 5 | intercept, complete |
//! | `access` | 10 | intercept |
//! | `degradation` | 20 | intercept |
//! | `snapshot` | 100 | before |

mod access;
mod deadline;
mod degradation;
mod snapshot;
mod trace;

pub use access::AccessController;
pub use deadline::DeadlineController;
pub use degradation::{DegradationController, DegradationMode};
pub use snapshot::{SnapshotController, SnapshotStore};
pub use trace::{TraceController, TraceEntry};
