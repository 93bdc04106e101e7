//! SimpleBoard CLI - a terminal client for the SimpleBoard bulletin board.
//!
//! Logs in against the board API, keeps the session alive across runs and
//! ends it after three hours without activity.

mod app;
mod commands;
mod shell;

#[cfg(test)]
mod test_support;

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use simpleboard_core::config::Config;

use app::App;
use commands::{Command, USAGE};

/// Log file prefix in the cache directory; rotated daily.
const LOG_FILE: &str = "simpleboard.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a daily rolling file so they never mix with command output.
/// `RUST_LOG` overrides the default level.
fn init_tracing(log_dir: &Path, is_prod: bool) -> WorkerGuard {
    let default_level = if is_prod { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n", e);
            eprint!("{}", USAGE);
            std::process::exit(2);
        }
    };

    let (config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let _log_guard = init_tracing(&config.cache_dir()?, config.is_prod());
    info!(?command, "SimpleBoard starting");
    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    let mut app = App::new(config)?;
    app.check_idle_expiry();

    match command {
        Command::Shell => shell::run(&mut app).await?,
        command => commands::run(&mut app, command).await?,
    }

    info!("SimpleBoard exiting");
    Ok(())
}
