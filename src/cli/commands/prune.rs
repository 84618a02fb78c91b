//! Prune command implementation.
//!
//! The `setuptree prune` command deletes all but the most recent run files.

use std::io::Write;

use async_trait::async_trait;

use crate::error::Result;
use crate::state::FileStateStore;

use super::dispatcher::{Command, CommandResult};

/// The prune command implementation.
pub struct PruneCommand {
    store: FileStateStore,
    keep: usize,
}

impl PruneCommand {
    /// Create a command keeping the `keep` newest runs.
    pub fn new(store: FileStateStore, keep: usize) -> Self {
        Self { store, keep }
    }
}

#[async_trait]
impl Command for PruneCommand {
    async fn execute(&self, out: &mut (dyn Write + Send)) -> Result<CommandResult> {
        let removed = self.store.prune(self.keep).await?;
        writeln!(
            out,
            "Removed {} run{} (kept up to {})",
            removed,
            if removed == 1 { "" } else { "s" },
            self.keep
        )?;
        Ok(CommandResult::success())
    }
}
