//! Engine settings.
//!
//! Settings are read from an optional YAML file and then overridden by
//! environment variables:
//!
//! | Variable              | Field        |
//! |-----------------------|--------------|
//! | `SETUPTREE_STATE_DIR` | `state_dir`  |
//! | `SETUPTREE_LOG`       | `log_filter` |

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SetupError};

/// Overrides `state_dir`.
pub const STATE_DIR_ENV: &str = "SETUPTREE_STATE_DIR";

/// Overrides `log_filter`.
pub const LOG_ENV: &str = "SETUPTREE_LOG";

/// Which transitions [`CheckpointHooks`](crate::runner::CheckpointHooks)
/// persist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckpointPolicy {
    /// Save on run start, every step transition, and run end.
    #[default]
    EveryTransition,
    /// Save on run start and run end only.
    TerminalOnly,
    /// Never save.
    Disabled,
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory for run state files. No file store is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// When run state is checkpointed.
    pub checkpoint: CheckpointPolicy,

    /// How many runs `prune` keeps by default.
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,

    /// `tracing` filter directive used by the binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

fn default_history_retention() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: None,
            checkpoint: CheckpointPolicy::default(),
            history_retention: default_history_retention(),
            log_filter: None,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsParseError` if the YAML is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&content, path)
    }

    /// Parse settings from YAML text. `source_path` is used in errors only.
    pub fn parse(content: &str, source_path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| SetupError::SettingsParseError {
            path: source_path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply environment overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = value(STATE_DIR_ENV) {
            self.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = value(LOG_ENV) {
            self.log_filter = Some(filter);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.state_dir.is_none());
        assert_eq!(settings.checkpoint, CheckpointPolicy::EveryTransition);
        assert_eq!(settings.history_retention, 50);
        assert!(settings.log_filter.is_none());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load(&temp.path().join("settings.yml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_parses_all_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.yml");
        fs::write(
            &path,
            "state_dir: /var/lib/setuptree\n\
             checkpoint: terminal-only\n\
             history_retention: 5\n\
             log_filter: setuptree=trace\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.state_dir, Some(PathBuf::from("/var/lib/setuptree")));
        assert_eq!(settings.checkpoint, CheckpointPolicy::TerminalOnly);
        assert_eq!(settings.history_retention, 5);
        assert_eq!(settings.log_filter.as_deref(), Some("setuptree=trace"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings = Settings::parse("checkpoint: disabled", Path::new("s.yml")).unwrap();
        assert_eq!(settings.checkpoint, CheckpointPolicy::Disabled);
        assert_eq!(settings.history_retention, 50);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::parse("\n", Path::new("s.yml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = Settings::parse("checkpoint: [", Path::new("s.yml")).unwrap_err();
        assert!(matches!(err, SetupError::SettingsParseError { .. }));
    }

    #[test]
    fn unknown_policy_is_parse_error() {
        let err = Settings::parse("checkpoint: sometimes", Path::new("s.yml")).unwrap_err();
        assert!(err.to_string().contains("s.yml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (STATE_DIR_ENV, "/tmp/runs"),
            (LOG_ENV, "setuptree=debug"),
        ]
        .into_iter()
        .collect();
        let settings = Settings {
            state_dir: Some(PathBuf::from("/from/file")),
            ..Settings::default()
        }
        .apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.state_dir, Some(PathBuf::from("/tmp/runs")));
        assert_eq!(settings.log_filter.as_deref(), Some("setuptree=debug"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let settings = Settings {
            state_dir: Some(PathBuf::from("/from/file")),
            ..Settings::default()
        }
        .apply_env(|_| Some("  ".to_string()));
        assert_eq!(settings.state_dir, Some(PathBuf::from("/from/file")));
        assert!(settings.log_filter.is_none());
    }

    #[test]
    fn policy_serializes_kebab_case() {
        let yaml = serde_yaml::to_string(&CheckpointPolicy::TerminalOnly).unwrap();
        assert_eq!(yaml.trim(), "terminal-only");
    }
}
