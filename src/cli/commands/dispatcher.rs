//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::Result;
use crate::state::FileStateStore;
use crate::ui::Theme;

/// State directory used when neither the CLI nor the settings name one.
pub const DEFAULT_STATE_DIR: &str = ".setuptree/runs";

/// Trait for command implementations.
#[async_trait]
pub trait Command: Send + Sync {
    /// Execute the command, writing human-readable output to `out`.
    async fn execute(&self, out: &mut (dyn Write + Send)) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    /// Process exit status. Codes outside `0..=255` become 1.
    pub fn exit_status(&self) -> u8 {
        u8::try_from(self.exit_code).unwrap_or(1)
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    store: FileStateStore,
    settings: Settings,
    theme: Theme,
}

impl CommandDispatcher {
    /// Create a dispatcher reading runs from `state_dir`.
    pub fn new(state_dir: PathBuf, settings: Settings, theme: Theme) -> Self {
        Self {
            store: FileStateStore::new(state_dir),
            settings,
            theme,
        }
    }

    /// Get the state directory.
    pub fn state_dir(&self) -> &Path {
        self.store.path()
    }

    /// Dispatch and execute a command.
    pub async fn dispatch(
        &self,
        cli: &Cli,
        out: &mut (dyn Write + Send),
    ) -> Result<CommandResult> {
        match &cli.command {
            Commands::List(args) => {
                let cmd = super::list::ListCommand::new(
                    self.store.clone(),
                    args.clone(),
                    self.theme.clone(),
                );
                cmd.execute(out).await
            }
            Commands::Show(args) => {
                let cmd = super::show::ShowCommand::new(
                    self.store.clone(),
                    args.clone(),
                    self.theme.clone(),
                );
                cmd.execute(out).await
            }
            Commands::Prune(args) => {
                let keep = args.keep.unwrap_or(self.settings.history_retention);
                let cmd = super::prune::PruneCommand::new(self.store.clone(), keep);
                cmd.execute(out).await
            }
        }
    }
}

/// Pick the state directory: `--state-dir`, then settings, then the default.
pub fn resolve_state_dir(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.state_dir
        .clone()
        .or_else(|| settings.state_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
}
