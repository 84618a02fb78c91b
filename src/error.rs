//! Error types for setuptree operations.
//!
//! This module defines [`SetupError`], the error type returned by step
//! construction, persistence and settings loading, and a [`Result`] alias.
//!
//! Failures raised *while a run executes* are not `SetupError`s: the executor
//! captures them as [`InstallationError`](crate::state::InstallationError)
//! records inside the returned state.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for setuptree operations.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A step was constructed with a missing or empty required field.
    #[error("Invalid step '{name}': {message}")]
    InvalidStep { name: String, message: String },

    /// Two children of the same branch share a name.
    #[error("Duplicate step name '{name}' under branch '{parent}'")]
    DuplicateStepName { parent: String, name: String },

    /// No stored state exists for the requested run.
    #[error("Installation state not found: {id}")]
    StateNotFound { id: String },

    /// A string is not a well-formed run id.
    #[error("Invalid run id: {id}")]
    InvalidRunId { id: String },

    /// A stored state file could not be parsed.
    #[error("Failed to parse installation state at {path}: {message}")]
    StateParseError { path: PathBuf, message: String },

    /// The settings file could not be parsed.
    #[error("Failed to parse settings at {path}: {message}")]
    SettingsParseError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for setuptree operations.
pub type Result<T> = std::result::Result<T, SetupError>;
