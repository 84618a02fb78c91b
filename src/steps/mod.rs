//! Step tree definition.
//!
//! This module provides the static side of the engine:
//!
//! - [`Step`] - A leaf or branch node of the step tree
//! - [`StepMeta`] - Display metadata copied into the status tree
//! - [`InstallationContext`] / [`ExecutionContext`] - Data visible to steps
//! - [`StepFailure`] - A failure with its own error key and payload
//!
//! # Example
//!
//! ```
//! use setuptree::steps::{Step, StepMeta};
//! use serde_json::json;
//!
//! struct AppConfig {
//!     webhooks: bool,
//! }
//!
//! let subscriptions = Step::leaf("subscriptions", StepMeta::new("Create subscriptions"))
//!     .when(|config: &AppConfig| config.webhooks)
//!     .run_blocking(|_config, _ctx| Ok(json!({"created": 3})))
//!     .unwrap();
//!
//! let root = Step::branch("installation", StepMeta::new("Installation"))
//!     .child(subscriptions)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(root.children().len(), 1);
//! ```

pub mod context;
pub mod failure;
pub mod model;

pub use context::{ContextFragment, Credentials, ExecutionContext, InstallationContext};
pub use failure::StepFailure;
pub use model::{BranchBuilder, BranchStep, LeafBuilder, LeafStep, Step, StepFuture, StepMeta};
