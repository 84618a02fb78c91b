//! setuptree CLI entry point.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use setuptree::cli::{resolve_state_dir, Cli, CommandDispatcher};
use setuptree::config::Settings;
use setuptree::ui::{should_use_colors, Theme};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Settings file used when `--settings` is not given.
const DEFAULT_SETTINGS: &str = ".setuptree/settings.yml";

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. `log_filter` from settings (or `SETUPTREE_LOG`)
/// 4. Default is INFO
fn init_tracing(debug: bool, configured: Option<&str>) {
    let filter = if debug {
        EnvFilter::new("setuptree=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured.unwrap_or("setuptree=info")))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS));
    let settings = match Settings::load(&settings_path) {
        Ok(settings) => settings.with_env(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    init_tracing(cli.debug, settings.log_filter.as_deref());
    tracing::debug!("setuptree starting with args: {:?}", cli);

    let theme = if cli.no_color || !should_use_colors() {
        Theme::plain()
    } else {
        Theme::new()
    };

    let state_dir = resolve_state_dir(&cli, &settings);
    let dispatcher = CommandDispatcher::new(state_dir, settings, theme.clone());

    let mut stdout = std::io::stdout();
    match dispatcher.dispatch(&cli, &mut stdout).await {
        Ok(result) => {
            let _ = stdout.flush();
            ExitCode::from(result.exit_status())
        }
        Err(e) => {
            eprintln!("{}", theme.format_error(&format!("Error: {}", e)));
            ExitCode::from(1)
        }
    }
}
