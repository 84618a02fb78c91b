//! Installation and execution contexts.
//!
//! The [`InstallationContext`] is created once per run by the caller. Each
//! branch step may contribute a [`ContextFragment`]; the [`ExecutionContext`]
//! a leaf observes is the installation context plus every ancestor fragment,
//! merged root-to-leaf so that the innermost fragment wins on key collision.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Key/value data contributed by a branch step to all of its descendants.
pub type ContextFragment = Map<String, Value>;

/// Secret values such as API keys or client secrets.
///
/// `Debug` output lists the keys only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials(HashMap<String, String>);

impl Credentials {
    /// Create an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a credential.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of credentials.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no credentials are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.0.keys().collect();
        keys.sort();
        f.debug_map()
            .entries(keys.into_iter().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Caller-supplied, read-only data available to every step of a run.
#[derive(Debug, Clone)]
pub struct InstallationContext {
    credentials: Credentials,
    params: Map<String, Value>,
    span: tracing::Span,
}

impl InstallationContext {
    /// Create a context whose logging sink is a new `installation` span.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            params: Map::new(),
            span: tracing::info_span!("installation"),
        }
    }

    /// Set the raw invocation parameters.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Set the span steps log into.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Credentials for remote services.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Raw invocation parameters.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Logging sink for the run.
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl Default for InstallationContext {
    fn default() -> Self {
        Self::new(Credentials::new())
    }
}

/// The context a leaf's `run` observes.
///
/// Fragment values never shadow the typed installation fields; they live in
/// their own key space reachable through [`get`](Self::get).
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    installation: Arc<InstallationContext>,
    values: Map<String, Value>,
}

impl ExecutionContext {
    /// Root execution context: the installation context with no fragments.
    pub fn new(installation: Arc<InstallationContext>) -> Self {
        Self {
            installation,
            values: Map::new(),
        }
    }

    /// A copy of this context with `fragment` layered on top.
    ///
    /// Keys present in `fragment` replace existing ones.
    pub fn merged(&self, fragment: ContextFragment) -> Self {
        let mut values = self.values.clone();
        values.extend(fragment);
        Self {
            installation: Arc::clone(&self.installation),
            values,
        }
    }

    /// The installation context this context was derived from.
    pub fn installation(&self) -> &InstallationContext {
        &self.installation
    }

    /// Shorthand for the installation credentials.
    pub fn credentials(&self) -> &Credentials {
        self.installation.credentials()
    }

    /// Shorthand for the raw invocation parameters.
    pub fn params(&self) -> &Map<String, Value> {
        self.installation.params()
    }

    /// Look up a value contributed by an ancestor branch.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Deserialize a value contributed by an ancestor branch.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("context value '{}' is not set", key))?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("context value '{}' has unexpected shape: {}", key, e))
    }

    /// All values contributed by ancestor branches.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment(value: Value) -> ContextFragment {
        match value {
            Value::Object(map) => map,
            _ => panic!("fragment must be an object"),
        }
    }

    #[test]
    fn merged_fragments_innermost_wins() {
        let root = ExecutionContext::new(Arc::new(InstallationContext::default()));
        let outer = root.merged(fragment(
            json!({"outerValue": "from-outer", "shared": "outer-original"}),
        ));
        let inner = outer.merged(fragment(
            json!({"innerValue": "from-inner", "shared": "inner-override"}),
        ));

        assert_eq!(inner.get("outerValue"), Some(&json!("from-outer")));
        assert_eq!(inner.get("innerValue"), Some(&json!("from-inner")));
        assert_eq!(inner.get("shared"), Some(&json!("inner-override")));
        assert_eq!(outer.get("shared"), Some(&json!("outer-original")));
        assert!(root.values().is_empty());
    }

    #[test]
    fn get_as_deserializes_values() {
        let ctx = ExecutionContext::new(Arc::new(InstallationContext::default()))
            .merged(fragment(json!({"workspace": {"id": 42}})));

        #[derive(serde::Deserialize)]
        struct Workspace {
            id: u32,
        }

        let workspace: Workspace = ctx.get_as("workspace").unwrap();
        assert_eq!(workspace.id, 42);
        assert!(ctx.get_as::<Workspace>("missing").is_err());
        assert!(ctx.get_as::<String>("workspace").is_err());
    }

    #[test]
    fn execution_context_exposes_installation_fields() {
        let mut params = Map::new();
        params.insert("env".into(), json!("stage"));
        let installation = InstallationContext::new(Credentials::new().with("api_key", "s3cret"))
            .with_params(params);
        let ctx = ExecutionContext::new(Arc::new(installation));

        assert_eq!(ctx.credentials().get("api_key"), Some("s3cret"));
        assert_eq!(ctx.params()["env"], "stage");
    }

    #[test]
    fn credentials_debug_redacts_values() {
        let creds: Credentials = [("client_secret", "hunter2"), ("api_key", "abc")]
            .into_iter()
            .collect();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("api_key"));
        assert!(debug.contains("client_secret"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"abc\""));
        assert_eq!(creds.len(), 2);
    }
}
