//! The full record of one installation run.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{InstallationStatus, StepStatusNode};
use crate::plan::RunId;

/// Error key used when a leaf fails without choosing its own.
pub const STEP_FAILED: &str = "step_failed";

/// Error key used when a branch context factory fails.
pub const CONTEXT_FAILED: &str = "context_failed";

/// Error key used when the initial state was planned from a different tree.
pub const PLAN_MISMATCH: &str = "plan_mismatch";

/// Error key used when the initial state has already been executed.
pub const STATE_NOT_FRESH: &str = "state_not_fresh";

/// A captured step failure.
///
/// Exactly one exists per failed run. It is attached to the failing node and
/// to the top of the [`InstallationState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationError {
    /// Step names from the root to the failing step.
    pub path: Vec<String>,

    /// Coarse-grained error code.
    pub key: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Structured detail supplied by the failing step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl InstallationError {
    /// Create an error with a key and message.
    pub fn new(path: Vec<String>, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            key: key.into(),
            message: Some(message.into()),
            payload: None,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Dotted path for display, e.g. `installation.webhooks.subscriptions`.
    pub fn display_path(&self) -> String {
        self.path.join(".")
    }
}

impl std::fmt::Display for InstallationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} [{}]: {}", self.display_path(), self.key, message),
            None => write!(f, "{} [{}]", self.display_path(), self.key),
        }
    }
}

/// The run record: identity, overall status, status tree and accumulated data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationState {
    /// Unique run identifier.
    pub id: RunId,

    /// Overall status.
    pub status: InstallationStatus,

    /// When the run was planned.
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Run this one was resumed from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_from: Option<RunId>,

    /// Status tree of the applicable steps.
    pub root: StepStatusNode,

    /// Leaf results keyed by path segment (`data.root.step1`).
    #[serde(default)]
    pub data: Map<String, Value>,

    /// Set only when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<InstallationError>,
}

impl InstallationState {
    /// Create a state for a freshly planned run.
    pub fn new(id: RunId, started_at: DateTime<Utc>, root: StepStatusNode) -> Self {
        Self {
            id,
            status: InstallationStatus::InProgress,
            started_at,
            finished_at: None,
            resumed_from: None,
            root,
            data: Map::new(),
            error: None,
        }
    }

    /// Find a status node by path (first segment is the root name).
    pub fn node(&self, path: &[String]) -> Option<&StepStatusNode> {
        self.root.find(path)
    }

    /// Mutable variant of [`node`](Self::node).
    pub fn node_mut(&mut self, path: &[String]) -> Option<&mut StepStatusNode> {
        self.root.find_mut(path)
    }

    /// Store a leaf result at `data[path[0]][path[1]]...`.
    ///
    /// Intermediate objects are created as needed. An empty path is ignored.
    pub fn record_data(&mut self, path: &[String], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut map = &mut self.data;
        for segment in parents {
            let entry = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            map = match entry {
                Value::Object(inner) => inner,
                _ => unreachable!("entry was just made an object"),
            };
        }
        map.insert(last.clone(), value);
    }

    /// Read accumulated data at a path.
    pub fn data_at(&self, path: &[String]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.data.get(first)?, |value, segment| value.get(segment))
    }

    /// Deserialize accumulated data at a path.
    pub fn data_as<T: DeserializeOwned>(&self, path: &[String]) -> Option<T> {
        self.data_at(path)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Whether the run has finished.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the run finished successfully.
    pub fn succeeded(&self) -> bool {
        self.status == InstallationStatus::Succeeded
    }
}
