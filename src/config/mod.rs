//! Engine settings.
//!
//! The application configuration handed to steps is opaque to the engine.
//! This module covers the engine's own knobs only: where run state lives,
//! when it is checkpointed, and how much history is kept.
//!
//! # Example
//!
//! ```
//! use setuptree::config::{CheckpointPolicy, Settings};
//! use std::path::Path;
//!
//! let settings = Settings::parse("checkpoint: terminal-only", Path::new("settings.yml")).unwrap();
//! assert_eq!(settings.checkpoint, CheckpointPolicy::TerminalOnly);
//! assert_eq!(settings.history_retention, 50);
//! ```

pub mod settings;

pub use settings::{CheckpointPolicy, Settings, LOG_ENV, STATE_DIR_ENV};
