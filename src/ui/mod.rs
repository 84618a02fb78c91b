//! Terminal output for inspecting runs.
//!
//! - [`Theme`] - Console styles, with a plain variant for non-TTY output
//! - [`render_tree`] / [`render_state`] - Status tree and run summary text

pub mod format;
pub mod theme;
pub mod tree;

pub use format::{format_elapsed, format_relative_time};
pub use theme::{should_use_colors, Theme};
pub use tree::{render_state, render_tree};
