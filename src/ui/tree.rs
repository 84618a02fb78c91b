//! Text rendering of a run's status tree.

use chrono::{DateTime, Utc};

use super::format::{format_elapsed, format_relative_time};
use super::theme::Theme;
use crate::state::{InstallationState, StepStatusNode};

/// Render the status tree, one line per node.
///
/// ```text
/// ✗ Installation (installation)
/// ├── ✓ Provider (provider)
/// └── ✗ Webhooks (webhooks)
///     └── ✗ Subscriptions (subscriptions)
///         [step_failed] connection refused
/// ```
pub fn render_tree(root: &StepStatusNode, theme: &Theme) -> Vec<String> {
    let mut lines = Vec::new();
    push_node(&mut lines, root, theme, "", "");
    lines
}

fn push_node(
    lines: &mut Vec<String>,
    node: &StepStatusNode,
    theme: &Theme,
    lead: &str,
    child_lead: &str,
) {
    lines.push(format!(
        "{}{} {} {}",
        lead,
        theme.format_step_icon(node.status),
        theme.highlight.apply_to(&node.meta.label),
        theme.dim.apply_to(format!("({})", node.name))
    ));

    if let Some(error) = &node.error {
        let detail = match &error.message {
            Some(message) => format!("[{}] {}", error.key, message),
            None => format!("[{}]", error.key),
        };
        let indent = if node.children.is_empty() {
            child_lead.to_string()
        } else {
            format!("{}│   ", child_lead)
        };
        lines.push(format!("{}{}", indent, theme.error.apply_to(detail)));
    }

    let last = node.children.len().saturating_sub(1);
    for (i, child) in node.children.iter().enumerate() {
        let (branch, next) = if i == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        push_node(
            lines,
            child,
            theme,
            &format!("{}{}", child_lead, branch),
            &format!("{}{}", child_lead, next),
        );
    }
}

/// Render a run summary followed by its status tree.
pub fn render_state(state: &InstallationState, theme: &Theme, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = vec![
        theme.format_field("Run", &state.id.to_string()),
        theme.format_field(
            "Status",
            &theme.run_style(state.status).apply_to(state.status).to_string(),
        ),
        theme.format_field(
            "Started",
            &format!(
                "{} ({})",
                state.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                format_relative_time(state.started_at, now)
            ),
        ),
    ];

    if let Some(finished_at) = state.finished_at {
        lines.push(theme.format_field(
            "Took",
            &format_elapsed(finished_at.signed_duration_since(state.started_at)),
        ));
    }
    if let Some(previous) = &state.resumed_from {
        lines.push(theme.format_field("Resumed from", &previous.to_string()));
    }
    if let Some(error) = &state.error {
        lines.push(theme.format_error(&error.to_string()));
    }

    lines.push(String::new());
    lines.extend(render_tree(&state.root, theme));
    lines
}
