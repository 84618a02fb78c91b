//! setuptree - Workflow-tree installation orchestration.
//!
//! setuptree sequences the setup actions of a pluggable application. A
//! static tree of steps is filtered against the application configuration,
//! executed depth-first in declaration order with fail-fast semantics, and
//! tracked in a serializable run state that can be checkpointed, inspected
//! and resumed.
//!
//! # Modules
//!
//! - [`steps`] - Step tree model and the contexts steps observe
//! - [`plan`] - Run ids, injected clock, and the plan/state builder
//! - [`state`] - Run state, status tree, and persistence
//! - [`runner`] - Executor, observer hooks, and the [`Installer`](runner::Installer) facade
//! - [`config`] - Engine settings
//! - [`ui`] - Terminal rendering of runs
//! - [`cli`] - The `setuptree` inspection CLI
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```
//! use setuptree::plan::create_initial_state;
//! use setuptree::runner::{execute_workflow, ExecuteRequest};
//! use setuptree::steps::{InstallationContext, Step, StepMeta};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct AppConfig {
//!     webhooks: bool,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let root = Step::branch("installation", StepMeta::new("Installation"))
//!     .child(
//!         Step::leaf("provider", StepMeta::new("Create provider"))
//!             .run(|_config, _ctx| async { Ok(json!({"id": "p-1"})) })
//!             .unwrap(),
//!     )
//!     .child(
//!         Step::leaf("subscriptions", StepMeta::new("Subscribe to webhooks"))
//!             .when(|config: &AppConfig| config.webhooks)
//!             .run_blocking(|_config, _ctx| Ok(json!(3)))
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let config = AppConfig { webhooks: false };
//! let state = create_initial_state(&root, &config);
//! assert_eq!(state.root.children.len(), 1);
//!
//! let result = execute_workflow(ExecuteRequest::new(
//!     &root,
//!     InstallationContext::default(),
//!     Arc::new(config),
//!     state,
//! ))
//! .await;
//! assert!(result.succeeded());
//! assert_eq!(result.data["installation"]["provider"]["id"], "p-1");
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod plan;
pub mod runner;
pub mod state;
pub mod steps;
pub mod ui;

pub use error::{Result, SetupError};
