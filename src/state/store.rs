//! Installation state persistence.
//!
//! The engine never persists state by itself; callers (or
//! [`CheckpointHooks`](crate::runner::CheckpointHooks)) call
//! [`InstallationStateStore::save`] after meaningful transitions. Saving the
//! same run id again overwrites the previous snapshot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use super::InstallationState;
use crate::error::{Result, SetupError};
use crate::plan::RunId;

/// Storage backend for installation state snapshots.
#[async_trait]
pub trait InstallationStateStore: Send + Sync {
    /// Load the latest snapshot of a run.
    async fn get(&self, id: &RunId) -> Result<Option<InstallationState>>;

    /// Store a snapshot, replacing any previous one for the same run.
    async fn save(&self, state: &InstallationState) -> Result<()>;
}

/// In-memory state store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<RunId, InstallationState>>,
    saves: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls received so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of distinct runs stored.
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait]
impl InstallationStateStore for MemoryStateStore {
    async fn get(&self, id: &RunId) -> Result<Option<InstallationState>> {
        Ok(self.states.read().await.get(id).cloned())
    }

    async fn save(&self, state: &InstallationState) -> Result<()> {
        self.states
            .write()
            .await
            .insert(state.id.clone(), state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Stores one pretty-printed JSON file per run in a directory.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store rooted at `path`. The directory is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the store path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path of a run's state file.
    fn state_path(&self, id: &RunId) -> PathBuf {
        self.path.join(format!("{}.json", id))
    }

    /// List stored runs, most recent first.
    ///
    /// Files that cannot be read or parsed are ignored.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<InstallationState>> {
        let mut states = Vec::new();

        let mut entries = match fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(states),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(json) = fs::read_to_string(&path).await {
                    if let Ok(state) = serde_json::from_str::<InstallationState>(&json) {
                        states.push(state);
                    }
                }
            }
        }

        // Sort by start time descending
        states.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        states.truncate(limit);

        Ok(states)
    }

    /// Delete all but the `keep` most recent runs. Returns how many were removed.
    pub async fn prune(&self, keep: usize) -> Result<usize> {
        let states = self.list_recent(usize::MAX).await?;
        let mut removed = 0;

        for state in states.into_iter().skip(keep) {
            if fs::remove_file(self.state_path(&state.id)).await.is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[async_trait]
impl InstallationStateStore for FileStateStore {
    async fn get(&self, id: &RunId) -> Result<Option<InstallationState>> {
        let path = self.state_path(id);
        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state = serde_json::from_str(&json).map_err(|e| SetupError::StateParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(state))
    }

    /// Writes to a temp file and renames it over the target, so a crash
    /// mid-write never leaves a partial snapshot behind.
    async fn save(&self, state: &InstallationState) -> Result<()> {
        fs::create_dir_all(&self.path).await?;

        let path = self.state_path(&state.id);
        let json = serde_json::to_string_pretty(state).map_err(anyhow::Error::from)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, &path).await?;

        debug!("Saved installation state {} ({})", state.id, state.status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{FixedClock, RandomIdGenerator, StateBuilder};
    use crate::state::InstallationStatus;
    use crate::steps::{Step, StepMeta};
    use chrono::{DateTime, Duration};
    use tempfile::TempDir;

    fn root() -> Step<()> {
        Step::branch("root", StepMeta::new("Root"))
            .child(
                Step::leaf("a", StepMeta::new("A"))
                    .run_blocking(|_, _| Ok(()))
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn state_at(offset_secs: i64) -> InstallationState {
        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
            + Duration::seconds(offset_secs);
        StateBuilder::new()
            .with_clock(FixedClock(at))
            .with_id_generator(RandomIdGenerator)
            .build(&root(), &())
    }

    #[tokio::test]
    async fn memory_store_save_and_get() {
        let store = MemoryStateStore::new();
        let state = state_at(0);

        assert!(store.get(&state.id).await.unwrap().is_none());
        store.save(&state).await.unwrap();

        let loaded = store.get(&state.id).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn memory_store_save_is_idempotent_per_run() {
        let store = MemoryStateStore::new();
        let mut state = state_at(0);
        store.save(&state).await.unwrap();

        state.status = InstallationStatus::Succeeded;
        store.save(&state).await.unwrap();
        store.save(&state).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.save_count(), 3);
        let loaded = store.get(&state.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, InstallationStatus::Succeeded);
    }

    #[tokio::test]
    async fn file_store_save_and_get() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path().join("runs"));
        let state = state_at(0);

        store.save(&state).await.unwrap();
        let loaded = store.get(&state.id).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(!temp
            .path()
            .join("runs")
            .join(format!("{}.json.tmp", state.id))
            .exists());
    }

    #[tokio::test]
    async fn file_store_get_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path());
        let state = state_at(0);
        assert!(store.get(&state.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_get_corrupt_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path());
        let state = state_at(0);
        std::fs::write(temp.path().join(format!("{}.json", state.id)), "{not json").unwrap();

        let err = store.get(&state.id).await.unwrap_err();
        assert!(matches!(err, SetupError::StateParseError { .. }));
    }

    #[tokio::test]
    async fn file_store_list_recent_sorted_descending() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path());
        let oldest = state_at(0);
        let middle = state_at(10);
        let newest = state_at(20);
        for state in [&middle, &oldest, &newest] {
            store.save(state).await.unwrap();
        }
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let recent = store.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, newest.id);
        assert_eq!(recent[2].id, oldest.id);

        let limited = store.list_recent(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn file_store_list_recent_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path().join("never-created"));
        assert!(store.list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_prune_keeps_newest() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path());
        for offset in 0..5 {
            store.save(&state_at(offset)).await.unwrap();
        }

        let removed = store.prune(2).await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(store.list_recent(10).await.unwrap().len(), 2);
    }
}
