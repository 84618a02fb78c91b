//! Command-line interface for inspecting stored runs.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ListArgs, PruneArgs, ShowArgs};
pub use commands::{resolve_state_dir, Command, CommandDispatcher, CommandResult};
