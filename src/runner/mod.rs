//! Step execution orchestration.
//!
//! - [`execute_workflow`] - Walks a planned tree and returns the final state
//! - [`InstallationHooks`] - Observer invoked at every transition
//! - [`Installer`] - Plan, execute, checkpoint and resume in one place

pub mod executor;
pub mod hooks;
pub mod installer;

pub use executor::{execute_workflow, ExecuteRequest};
pub use hooks::{CheckpointHooks, HookChain, InstallationHooks, NoopHooks, StepEvent, TracingHooks};
pub use installer::Installer;
