//! Run-scoped installation state.
//!
//! This module holds everything that changes while a run executes: the
//! status tree mirroring the applicable steps, the accumulated leaf data,
//! the captured failure, and the persistence contract for snapshots.

pub mod installation;
pub mod node;
pub mod status;
pub mod store;

pub use installation::{
    InstallationError, InstallationState, CONTEXT_FAILED, PLAN_MISMATCH, STATE_NOT_FRESH,
    STEP_FAILED,
};
pub use node::StepStatusNode;
pub use status::{InstallationStatus, NodeKind, StepStatus};
pub use store::{FileStateStore, InstallationStateStore, MemoryStateStore};
