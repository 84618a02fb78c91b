//! Typed failures a step body may return.

use serde_json::Value;
use thiserror::Error;

/// A failure carrying its own error key and structured payload.
///
/// Any error works as a step failure; return (or wrap) this one when the
/// captured [`InstallationError`](crate::state::InstallationError) should
/// carry a specific `key` or a `payload` instead of the generic defaults.
///
/// ```
/// use setuptree::steps::StepFailure;
/// use serde_json::json;
///
/// let err = StepFailure::new("provider_conflict", "provider already exists")
///     .with_payload(json!({"provider": "commerce"}));
/// assert_eq!(err.key, "provider_conflict");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct StepFailure {
    /// Error code reported as the installation error key.
    pub key: String,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail.
    pub payload: Option<Value>,
}

impl StepFailure {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}
