use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::{error::Error, io, path::PathBuf};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use task_manager::app;
use task_manager::config::{Config, LoggingConfig, DEFAULT_CONFIG_FILE};

/// Terminal task manager
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// SQLite file to keep the tasks in, overrides the config
    #[arg(long)]
    database: Option<PathBuf>,
}

// Start the app.
// This and the rest of the UI code heavily based on:
// https://github.com/ratatui-org/ratatui/blob/main/examples/list.rs
pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(database) = args.database {
        config.database_path = database;
    }
    let _log_guard = init_tracing(&config.logging)?;

    // Open the database before touching the terminal so errors stay readable
    let storage = app::storage::Storage::open(&config.database_path)?;
    info!(database = %config.database_path.display(), "starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = app::ui::App::new(&storage, &config);
    let res = app::ui::run_app(&mut terminal, app, config.tick_rate());

    // Restore previous terminal state after exit
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "terminal loop failed");
        println!("{err:?}");
    }

    Ok(())
}

// Logs go to a file, the terminal belongs to the UI.
// RUST_LOG wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> task_manager::Result<WorkerGuard> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(&logging.level)
            .map_err(|e| task_manager::Error::InvalidConfig(format!("logging.level: {e}")))?,
    };

    let directory = match logging.file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = logging.file.file_name().ok_or_else(|| {
        task_manager::Error::InvalidConfig("logging.file has no file name".to_string())
    })?;
    std::fs::create_dir_all(&directory)?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
