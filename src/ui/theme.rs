//! Visual theme and styling.

use console::Style;

use crate::state::{InstallationStatus, StepStatus};

/// Terminal styles for run output.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Succeeded steps and runs (green).
    pub success: Style,
    /// Failed steps and error text (red bold).
    pub error: Style,
    /// In-progress steps (magenta).
    pub info: Style,
    /// Pending steps and secondary text.
    pub dim: Style,
    /// Step labels (bold).
    pub highlight: Style,
    /// Key labels in key-value displays (bold).
    pub key: Style,
    /// Values in key-value displays.
    pub value: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    /// Create the default colored theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            error: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            key: Style::new().bold(),
            value: Style::new(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            key: Style::new(),
            value: Style::new(),
        }
    }

    /// Style matching a step status.
    pub fn step_style(&self, status: StepStatus) -> &Style {
        match status {
            StepStatus::Pending => &self.dim,
            StepStatus::InProgress => &self.info,
            StepStatus::Succeeded => &self.success,
            StepStatus::Failed => &self.error,
        }
    }

    /// Style matching an overall run status.
    pub fn run_style(&self, status: InstallationStatus) -> &Style {
        match status {
            InstallationStatus::Pending => &self.dim,
            InstallationStatus::InProgress => &self.info,
            InstallationStatus::Succeeded => &self.success,
            InstallationStatus::Failed => &self.error,
        }
    }

    /// Status icon in its status color.
    pub fn format_step_icon(&self, status: StepStatus) -> String {
        self.step_style(status)
            .apply_to(status.display_char())
            .to_string()
    }

    /// Format an error message (icon + text in red bold).
    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    /// Format a `key: value` line.
    pub fn format_field(&self, key: &str, value: &str) -> String {
        format!(
            "{} {}",
            self.key.apply_to(format!("{}:", key)),
            self.value.apply_to(value)
        )
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // Check NO_COLOR env var (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}
