//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// setuptree - Inspect installation runs.
#[derive(Debug, Parser)]
#[command(name = "setuptree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding run state files (overrides settings)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Path to the settings file
    #[arg(long, global = true, env = "SETUPTREE_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List recent runs
    List(ListArgs),

    /// Show one run's status tree
    Show(ShowArgs),

    /// Delete old run state files
    Prune(PruneArgs),
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ListArgs {
    /// Maximum number of runs to show
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self { limit: 10 }
    }
}

/// Arguments for the `show` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ShowArgs {
    /// Run id (`inst_...`)
    pub run_id: String,

    /// Print the raw state as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `prune` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PruneArgs {
    /// Number of most recent runs to keep (defaults to settings)
    #[arg(long)]
    pub keep: Option<usize>,
}
