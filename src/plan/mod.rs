//! Run planning.
//!
//! - [`RunId`] - Unique run identifier
//! - [`IdGenerator`] / [`Clock`] - Injected sources of ids and time
//! - [`StateBuilder`] - Filters a step tree into an initial state

pub mod builder;
pub mod id;

pub use builder::{create_initial_state, resume_state, StateBuilder};
pub use id::{Clock, FixedClock, IdGenerator, RandomIdGenerator, RunId, SystemClock};
