//! Show command implementation.
//!
//! The `setuptree show <run-id>` command prints one run's summary and status
//! tree, or its raw JSON with `--json`.

use std::io::Write;

use async_trait::async_trait;
use chrono::Utc;

use crate::cli::args::ShowArgs;
use crate::error::{Result, SetupError};
use crate::plan::RunId;
use crate::state::{FileStateStore, InstallationStateStore};
use crate::ui::{render_state, Theme};

use super::dispatcher::{Command, CommandResult};

/// The show command implementation.
pub struct ShowCommand {
    store: FileStateStore,
    args: ShowArgs,
    theme: Theme,
}

impl ShowCommand {
    /// Create a new show command.
    pub fn new(store: FileStateStore, args: ShowArgs, theme: Theme) -> Self {
        Self { store, args, theme }
    }
}

#[async_trait]
impl Command for ShowCommand {
    async fn execute(&self, out: &mut (dyn Write + Send)) -> Result<CommandResult> {
        let id = RunId::parse(&self.args.run_id).ok_or_else(|| SetupError::InvalidRunId {
            id: self.args.run_id.clone(),
        })?;
        let state = self
            .store
            .get(&id)
            .await?
            .ok_or_else(|| SetupError::StateNotFound { id: id.to_string() })?;

        if self.args.json {
            let json = serde_json::to_string_pretty(&state).map_err(anyhow::Error::from)?;
            writeln!(out, "{}", json)?;
        } else {
            for line in render_state(&state, &self.theme, Utc::now()) {
                writeln!(out, "{}", line)?;
            }
        }

        // A failed run is reported, not an error of this command.
        if state.succeeded() || !state.is_terminal() {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StateBuilder;
    use crate::state::{InstallationState, InstallationStatus};
    use crate::steps::{Step, StepMeta};
    use tempfile::TempDir;

    fn state() -> InstallationState {
        let root: Step<()> = Step::branch("installation", StepMeta::new("Installation"))
            .child(
                Step::leaf("provider", StepMeta::new("Provider"))
                    .run_blocking(|_, _| Ok(()))
                    .unwrap(),
            )
            .build()
            .unwrap();
        StateBuilder::new().build(&root, &())
    }

    async fn run(
        store: FileStateStore,
        run_id: &str,
        json: bool,
    ) -> (Result<CommandResult>, String) {
        let cmd = ShowCommand::new(
            store,
            ShowArgs {
                run_id: run_id.to_string(),
                json,
            },
            Theme::plain(),
        );
        let mut out = Vec::new();
        let result = cmd.execute(&mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn show_renders_tree() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path());
        let state = state();
        store.save(&state).await.unwrap();

        let (result, output) = run(store, &state.id.to_string(), false).await;

        assert!(result.unwrap().success);
        assert!(output.contains("Status: in-progress"));
        assert!(output.contains("○ Installation (installation)"));
        assert!(output.contains("└── ○ Provider (provider)"));
    }

    #[tokio::test]
    async fn show_json_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path());
        let state = state();
        store.save(&state).await.unwrap();

        let (_, output) = run(store, &state.id.to_string(), true).await;
        let parsed: InstallationState = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, state);
    }

    #[tokio::test]
    async fn show_failed_run_exits_non_zero() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path());
        let mut state = state();
        state.status = InstallationStatus::Failed;
        store.save(&state).await.unwrap();

        let (result, _) = run(store, &state.id.to_string(), false).await;
        assert_eq!(result.unwrap().exit_code, 1);
    }

    #[tokio::test]
    async fn show_invalid_id() {
        let temp = TempDir::new().unwrap();
        let (result, _) = run(FileStateStore::new(temp.path()), "not-a-run", false).await;
        assert!(matches!(result, Err(SetupError::InvalidRunId { .. })));
    }

    #[tokio::test]
    async fn show_missing_run() {
        let temp = TempDir::new().unwrap();
        let id = state().id.to_string();
        let (result, _) = run(FileStateStore::new(temp.path()), &id, false).await;
        assert!(matches!(result, Err(SetupError::StateNotFound { .. })));
    }
}
