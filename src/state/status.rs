//! Run-scoped status values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single step within a run.
///
/// The only valid transitions are `Pending -> InProgress` and
/// `InProgress -> Succeeded | Failed`. Terminal statuses never change again
/// within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    /// Step has not started (or was never reached).
    Pending,

    /// Step is currently executing.
    InProgress,

    /// Step completed successfully.
    Succeeded,

    /// Step failed.
    Failed,
}

impl StepStatus {
    /// Check if this is a terminal state (no more changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Succeeded | StepStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::InProgress)
                | (StepStatus::InProgress, StepStatus::Succeeded)
                | (StepStatus::InProgress, StepStatus::Failed)
        )
    }

    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Pending => '○',
            StepStatus::InProgress => '◉',
            StepStatus::Succeeded => '✓',
            StepStatus::Failed => '✗',
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in-progress",
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Overall status of an installation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallationStatus {
    /// Run exists but has not been handed to the executor.
    Pending,
    /// Run is planned or executing.
    InProgress,
    /// Every applicable step succeeded.
    Succeeded,
    /// A step failed; see the state's `error`.
    Failed,
}

impl InstallationStatus {
    /// Check if the run has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstallationStatus::Succeeded | InstallationStatus::Failed
        )
    }
}

impl fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallationStatus::Pending => "pending",
            InstallationStatus::InProgress => "in-progress",
            InstallationStatus::Succeeded => "succeeded",
            InstallationStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Whether a status node mirrors a leaf or a branch step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Leaf,
    Branch,
}
