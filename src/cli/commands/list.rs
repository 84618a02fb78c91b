//! List command implementation.
//!
//! The `setuptree list` command shows recent runs, newest first.

use std::io::Write;

use async_trait::async_trait;
use chrono::Utc;

use crate::cli::args::ListArgs;
use crate::error::Result;
use crate::state::{FileStateStore, InstallationState, StepStatus};
use crate::ui::{format_relative_time, Theme};

use super::dispatcher::{Command, CommandResult};

/// The list command implementation.
pub struct ListCommand {
    store: FileStateStore,
    args: ListArgs,
    theme: Theme,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(store: FileStateStore, args: ListArgs, theme: Theme) -> Self {
        Self { store, args, theme }
    }

    fn format_row(&self, state: &InstallationState) -> String {
        let total = state.root.count();
        let done = state.root.count_with_status(StepStatus::Succeeded);
        let mut row = format!(
            "{}  {}  {:>3}/{:<3}  {}",
            state.id,
            self.theme
                .run_style(state.status)
                .apply_to(format!("{:<11}", state.status.to_string())),
            done,
            total,
            self.theme
                .dim
                .apply_to(format_relative_time(state.started_at, Utc::now())),
        );
        if let Some(error) = &state.error {
            row.push_str(&format!(
                "  {}",
                self.theme.error.apply_to(error.display_path())
            ));
        }
        row
    }
}

#[async_trait]
impl Command for ListCommand {
    async fn execute(&self, out: &mut (dyn Write + Send)) -> Result<CommandResult> {
        let states = self.store.list_recent(self.args.limit).await?;

        if states.is_empty() {
            writeln!(out, "No runs recorded in {}", self.store.path().display())?;
            return Ok(CommandResult::success());
        }

        for state in &states {
            writeln!(out, "{}", self.format_row(state))?;
        }

        Ok(CommandResult::success())
    }
}
